//! The engine facade: owns every surface and routes pointer input.
//!
//! All state is mutated from the host's input callbacks; the render loop
//! only reads a [`FrameSnapshot`]. Each operation applies its whole
//! mutation before returning, so a frame never observes half an edit.

use crate::config::EngineConfig;
use crate::coords::{ImagePoint, MappedPoint, SurfaceBox};
use crate::error::{EngineError, EngineResult};
use crate::events::EngineEvent;
use crate::gesture::{GestureArbiter, GestureMode, GestureOutcome};
use crate::image_buffer::ImageBuffer;
use crate::input::PointerEvent;
use crate::mask::{self, MaskFile, MaskSurface};
use crate::polygon::{PointSet, Polygon};
use crate::raster;
use crate::selection::FloatingSelection;
use crate::snapshot::{FrameSnapshot, RasterBrushView, SpotlightSource, ToolOverlay};
use crate::stroke::{Stroke, StrokeRecorder};
use crate::tools::{Interaction, ToolFlags, ToolKind};
use crate::view::ViewTransform;
use image::RgbaImage;

/// Base image and the surfaces that must always match its size.
#[derive(Debug, Clone)]
struct Session {
    image: ImageBuffer,
    processed: Option<ImageBuffer>,
    mask: MaskSurface,
}

#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    flags: ToolFlags,
    session: Option<Session>,
    polygons: Vec<Polygon>,
    points: PointSet,
    strokes: StrokeRecorder,
    gesture: GestureArbiter,
    view: ViewTransform,
    interaction: Interaction,
    selection: Option<FloatingSelection>,
    /// Last known pointer position, for the brush cursor and drag arrow.
    cursor: Option<ImagePoint>,
    events: Vec<EngineEvent>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            flags: ToolFlags::default(),
            session: None,
            polygons: Vec::new(),
            points: PointSet::default(),
            strokes: StrokeRecorder::new(config.quill_min_spacing),
            gesture: GestureArbiter::new(config.tap_threshold),
            view: ViewTransform::new(config.max_zoom),
            interaction: Interaction::Idle,
            selection: None,
            cursor: None,
            events: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn flags(&self) -> &ToolFlags {
        &self.flags
    }

    pub fn has_image(&self) -> bool {
        self.session.is_some()
    }

    pub fn image(&self) -> Option<&ImageBuffer> {
        self.session.as_ref().map(|s| &s.image)
    }

    pub fn mask(&self) -> Option<&MaskSurface> {
        self.session.as_ref().map(|s| &s.mask)
    }

    pub fn strokes(&self) -> &[Stroke] {
        self.strokes.strokes()
    }

    pub fn selection(&self) -> Option<&FloatingSelection> {
        self.selection.as_ref()
    }

    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    pub fn gesture_mode(&self) -> GestureMode {
        self.gesture.mode()
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    /// Take all events emitted since the last call.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    // ------------------------------------------------------------------
    // Inputs from the host
    // ------------------------------------------------------------------

    /// Replace the base image. The mask is recreated at the new size and
    /// every in-flight gesture, selection and zoom is dropped.
    pub fn set_base_image(&mut self, image: ImageBuffer) -> EngineResult<()> {
        let mask = MaskSurface::new(image.width(), image.height())?;
        log::info!("base image set: {}x{}", image.width(), image.height());

        self.cancel_interaction();
        self.gesture.cancel();
        self.view.reset();
        self.selection = None;
        self.cursor = None;
        self.session = Some(Session {
            image,
            processed: None,
            mask,
        });

        if self.flags.is_raster_active() {
            self.seed_if_empty();
        }
        if self.flags.active_tool == Some(ToolKind::Move) {
            self.init_selection();
        }
        Ok(())
    }

    pub fn clear_image(&mut self) {
        self.cancel_interaction();
        self.gesture.cancel();
        self.view.reset();
        self.selection = None;
        self.cursor = None;
        self.session = None;
    }

    /// Set (or clear) the color-adjusted variant drawn instead of the raw image.
    pub fn set_processed_image(&mut self, processed: Option<ImageBuffer>) -> EngineResult<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        session.processed = match processed {
            Some(p) if p.width() != session.image.width() || p.height() != session.image.height() => {
                let resized = raster::resize_rgba(
                    &p.to_rgba_image(),
                    session.image.width(),
                    session.image.height(),
                );
                Some(ImageBuffer::from_rgba_image(&resized)?)
            }
            other => other,
        };
        Ok(())
    }

    /// React to new menu/tool flags. Changing tool, menu, quill or brush
    /// mode cancels whatever gesture was in progress.
    pub fn set_flags(&mut self, flags: ToolFlags) {
        let old = std::mem::replace(&mut self.flags, flags);
        let new = &self.flags;
        let mode_changed = old.active_tool != new.active_tool
            || old.active_menu != new.active_menu
            || old.quill_mode != new.quill_mode
            || old.is_raster_active() != new.is_raster_active();
        if !mode_changed {
            return;
        }
        log::debug!(
            "tool flags changed: tool={:?} menu={:?}",
            new.active_tool,
            new.active_menu
        );

        let entering_move =
            new.active_tool == Some(ToolKind::Move) && old.active_tool != Some(ToolKind::Move);
        let leaving_move = new.active_tool != Some(ToolKind::Move);
        let entering_raster = new.is_raster_active() && !old.is_raster_active();

        self.cancel_interaction();
        self.gesture.cancel();

        if leaving_move {
            self.selection = None;
        } else if entering_move {
            self.init_selection();
        }
        if entering_raster {
            self.seed_if_empty();
        }
    }

    pub fn set_polygons(&mut self, polygons: Vec<Polygon>) {
        self.polygons = polygons;
        if self.flags.is_raster_active() {
            self.seed_if_empty();
        }
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn set_points(&mut self, points: PointSet) {
        self.points = points;
    }

    pub fn set_strokes(&mut self, strokes: Vec<Stroke>) {
        self.strokes.set_strokes(strokes);
    }

    /// Drop all strokes, e.g. when the editing session is confirmed.
    pub fn clear_strokes(&mut self) {
        self.strokes.clear();
    }

    /// Load an externally produced mask (PNG/JPEG/WebP bytes).
    pub fn load_external_mask(&mut self, bytes: &[u8]) -> EngineResult<()> {
        let image = raster::decode_rgba(bytes)?;
        self.load_external_mask_image(&image)
    }

    pub fn load_external_mask_image(&mut self, image: &RgbaImage) -> EngineResult<()> {
        let session = self.session.as_mut().ok_or(EngineError::NoImage)?;
        session
            .mask
            .load_external(image, self.config.black_threshold)?;
        log::info!("external mask loaded ({} px covered)", session.mask.coverage());
        if self.flags.active_tool == Some(ToolKind::Move) {
            self.init_selection();
        }
        Ok(())
    }

    /// Rasterize the current polygons into the mask, replacing its content.
    pub fn seed_mask_from_polygons(&mut self) -> EngineResult<()> {
        let session = self.session.as_mut().ok_or(EngineError::NoImage)?;
        session
            .mask
            .seed_from_polygons(&self.polygons, session.image.size());
        Ok(())
    }

    /// Encode the mask for the editing APIs.
    pub fn export_mask(&self) -> EngineResult<MaskFile> {
        self.session
            .as_ref()
            .ok_or(EngineError::NoImage)?
            .mask
            .to_file()
    }

    /// Encode the mask stretched to the configured working resolution used
    /// by the remote model servers.
    pub fn export_working_mask(&self) -> EngineResult<MaskFile> {
        let file = self.export_mask()?;
        mask::binary_mask_file(&file.png, self.config.working_resolution)
    }

    /// The on-screen box of the image surface: the container box under the
    /// current pan/zoom, mapped onto the loaded image's own pixel size. The
    /// host-supplied buffer size is only used while no image is loaded.
    pub fn surface_box(&self, container: &SurfaceBox) -> SurfaceBox {
        let buffer = self
            .session
            .as_ref()
            .map_or(container.buffer, |session| session.image.size());
        SurfaceBox::new(self.view.transformed_box(container.bounds), buffer)
    }

    // ------------------------------------------------------------------
    // Pointer input
    // ------------------------------------------------------------------

    /// Route one pointer event. `container` is the untransformed layout box
    /// of the surface container; it is read fresh on every event.
    pub fn handle_pointer(&mut self, event: PointerEvent, container: &SurfaceBox) {
        if self.session.is_none() {
            return;
        }
        let surface = self.surface_box(container);
        let origin = container.bounds.origin();

        let outcome = match event {
            PointerEvent::Down { id, position } => {
                self.gesture
                    .pointer_down(id, position, self.flags.multi_touch_allowed())
            }
            PointerEvent::Move {
                id,
                position,
                pressed,
            } => {
                if pressed {
                    self.gesture.pointer_move(id, position, origin)
                } else {
                    GestureOutcome::Hover(position)
                }
            }
            PointerEvent::Up { id, position } => self.gesture.pointer_up(id, Some(position)),
            PointerEvent::Leave { id } => {
                let outcome = self.gesture.pointer_up(id, None);
                self.cursor = None;
                outcome
            }
            PointerEvent::CaptureLost { id } => self.gesture.pointer_up(id, None),
        };

        match outcome {
            GestureOutcome::Ignored | GestureOutcome::PinchBaseline => {}
            GestureOutcome::Hover(position) => {
                self.cursor = Some(surface.map(position).image);
            }
            GestureOutcome::SingleStart(position) => self.begin_single(surface.map(position)),
            GestureOutcome::SingleMove { position, dragged } => {
                self.update_single(surface.map(position), dragged)
            }
            GestureOutcome::SingleEnd { position, dragged } => {
                self.end_single(surface.map(position), dragged)
            }
            GestureOutcome::SingleCancel => {
                log::debug!("single-pointer action cancelled by second pointer");
                self.cancel_interaction();
            }
            GestureOutcome::Pinch(step) => self.view.apply_pinch(step, container.bounds.size()),
            GestureOutcome::MultiEnd => {
                log::debug!("pinch ended at scale {:.3}", self.view.scale);
            }
        }
    }

    fn begin_single(&mut self, at: MappedPoint) {
        let p = at.image;
        self.cursor = Some(p);
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let flags = &self.flags;

        self.interaction = if let Some(mode) = flags.quill_mode {
            self.strokes.begin(p, mode, flags.brush_size, flags.pen_color);
            Interaction::Quill
        } else if flags.is_raster_active() {
            let checkpoint = session.mask.clone();
            let size = flags.effective_brush_size(self.config.assistant_brush_size);
            session.mask.paint_stroke(&[p], size, flags.paint_mode());
            Interaction::Brush { last: p, checkpoint }
        } else if flags.point_workflow_active() {
            Interaction::PointTrail { last_emit: None }
        } else {
            match flags.active_tool {
                Some(ToolKind::Drag) => Interaction::DragVector { start: p, end: p },
                Some(ToolKind::Move) => match self.selection.as_mut() {
                    Some(selection) if selection.contains(p) => {
                        selection.begin_drag();
                        Interaction::MoveGrab { last: p }
                    }
                    _ => Interaction::Tap { origin: p },
                },
                Some(ToolKind::Erase) | None => Interaction::Idle,
            }
        };
    }

    fn update_single(&mut self, at: MappedPoint, dragged: bool) {
        let p = at.image;
        self.cursor = Some(p);
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match &mut self.interaction {
            Interaction::Quill => {
                self.strokes.extend(p);
            }
            Interaction::Brush { last, .. } => {
                let size = self
                    .flags
                    .effective_brush_size(self.config.assistant_brush_size);
                session
                    .mask
                    .paint_stroke(&[*last, p], size, self.flags.paint_mode());
                *last = p;
            }
            Interaction::PointTrail { last_emit } => {
                if dragged
                    && self.flags.reports_clicks()
                    && Interaction::trail_ready(*last_emit, self.config.drag_point_interval_ms)
                {
                    self.events.push(EngineEvent::PointClick {
                        image: p,
                        display: at.display,
                    });
                    *last_emit = Some(Interaction::now());
                }
            }
            Interaction::DragVector { end, .. } => *end = p,
            Interaction::MoveGrab { last } => {
                if let Some(selection) = self.selection.as_mut() {
                    selection.drag_by(p - *last);
                }
                *last = p;
            }
            Interaction::Tap { .. } | Interaction::Idle => {}
        }
    }

    fn end_single(&mut self, at: MappedPoint, dragged: bool) {
        let p = at.image;
        match std::mem::take(&mut self.interaction) {
            Interaction::Quill => {
                if self.strokes.commit() {
                    self.events
                        .push(EngineEvent::StrokesChanged(self.strokes.strokes().to_vec()));
                }
            }
            Interaction::Brush { .. } => self.emit_mask_changed(),
            Interaction::PointTrail { .. } => {
                if !dragged {
                    self.point_tap(at);
                }
            }
            Interaction::DragVector { start, .. } => {
                self.events.push(EngineEvent::DragEnd { start, end: p });
            }
            Interaction::MoveGrab { .. } => {
                if let Some(selection) = self.selection.take() {
                    let end = selection.resolve();
                    log::debug!("move resolved: {:?} -> {:?}", end.start, end.end);
                    self.events.push(EngineEvent::DragEnd {
                        start: end.start,
                        end: end.end,
                    });
                }
            }
            Interaction::Tap { .. } => {
                if !dragged {
                    self.events.push(EngineEvent::PointClick {
                        image: p,
                        display: at.display,
                    });
                }
            }
            Interaction::Idle => {}
        }
    }

    /// A stationary tap in the point workflow: remove a nearby marker, or
    /// report a new click.
    fn point_tap(&mut self, at: MappedPoint) {
        if let Some((kind, index)) = self
            .points
            .hit_test(at.image, self.config.point_remove_radius)
        {
            self.events.push(EngineEvent::PointRemove { kind, index });
        } else if self.flags.reports_clicks() {
            self.events.push(EngineEvent::PointClick {
                image: at.image,
                display: at.display,
            });
        }
    }

    /// Discard the in-flight single-pointer action and its partial state.
    fn cancel_interaction(&mut self) {
        match std::mem::take(&mut self.interaction) {
            Interaction::Quill => {
                self.strokes.cancel();
            }
            Interaction::Brush { checkpoint, .. } => {
                if let Some(session) = self.session.as_mut() {
                    session.mask.restore(checkpoint);
                }
            }
            Interaction::MoveGrab { .. } => {
                if let Some(selection) = self.selection.as_mut() {
                    selection.cancel_drag();
                }
            }
            Interaction::PointTrail { .. }
            | Interaction::DragVector { .. }
            | Interaction::Tap { .. }
            | Interaction::Idle => {}
        }
    }

    fn emit_mask_changed(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        match session.mask.to_file() {
            Ok(file) => self.events.push(EngineEvent::MaskChanged(file)),
            Err(e) => {
                log::warn!("mask export failed: {e}");
                self.events.push(EngineEvent::MaskRejected {
                    reason: e.to_string(),
                });
            }
        }
    }

    fn seed_if_empty(&mut self) {
        if self.polygons.is_empty() {
            return;
        }
        if let Some(session) = self.session.as_mut() {
            if session.mask.is_empty() {
                session
                    .mask
                    .seed_from_polygons(&self.polygons, session.image.size());
            }
        }
    }

    fn init_selection(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        match FloatingSelection::extract(
            &session.mask,
            &session.image,
            self.config.selection_threshold,
            self.config.hole_threshold,
            self.config.hole_gray,
        ) {
            Ok(selection) => self.selection = Some(selection),
            Err(EngineError::EmptySelection) => {
                log::info!("move tool: nothing to move");
                self.selection = None;
                self.events.push(EngineEvent::NothingToMove);
            }
            Err(e) => {
                log::warn!("floating selection failed: {e}");
                self.selection = None;
            }
        }
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Immutable view of everything a frame draws, or `None` without an image.
    pub fn snapshot(&self) -> Option<FrameSnapshot> {
        let session = self.session.as_ref()?;
        let flags = &self.flags;

        let base = session
            .processed
            .as_ref()
            .unwrap_or(&session.image)
            .shared_pixmap();

        let spotlight = if !flags.shows_spotlight() {
            None
        } else if !session.mask.is_empty() {
            Some(SpotlightSource::Raster(session.mask.shared_pixmap()))
        } else if !self.polygons.is_empty() {
            Some(SpotlightSource::Polygons(self.polygons.clone()))
        } else {
            None
        };

        let overlay = match (&self.interaction, flags.active_tool, &self.selection) {
            (Interaction::DragVector { start, end }, Some(ToolKind::Drag), _) => {
                ToolOverlay::DragVector {
                    start: *start,
                    end: *end,
                }
            }
            (_, Some(ToolKind::Move), Some(selection)) => ToolOverlay::FloatingSelection {
                hole: selection.hole(),
                pixels: selection.pixels(),
                bounds: selection.bounds(),
                offset: selection.offset(),
            },
            _ => ToolOverlay::None,
        };

        let raster_brush = flags.is_raster_active().then(|| RasterBrushView {
            mask: session.mask.shared_pixmap(),
            cursor: self.cursor,
            size: flags.effective_brush_size(self.config.assistant_brush_size),
        });

        Some(FrameSnapshot {
            base,
            spotlight,
            strokes: self.strokes.visible(flags.quill_mode),
            current_stroke: self.strokes.current().filter(|s| s.is_drawable()).cloned(),
            points: if flags.shows_point_markers() {
                self.points.markers().collect()
            } else {
                Vec::new()
            },
            overlay,
            raster_brush,
            pen_color: flags.pen_color,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::ClientPoint;
    use crate::mask::PaintMode;
    use crate::tools::{ClickMode, MenuKind, QuillMode, SelectionMode};
    use kurbo::{Rect, Size};

    fn layout(w: f64, h: f64) -> SurfaceBox {
        SurfaceBox::new(Rect::new(0.0, 0.0, w, h), Size::new(w, h))
    }

    fn engine_with_image(w: u32, h: u32) -> Engine {
        let mut engine = Engine::default();
        engine
            .set_base_image(ImageBuffer::filled(w, h, [100, 100, 100, 255]).unwrap())
            .unwrap();
        engine
    }

    fn down(id: i64, x: f64, y: f64) -> PointerEvent {
        PointerEvent::Down {
            id,
            position: ClientPoint::new(x, y),
        }
    }

    fn mv(id: i64, x: f64, y: f64) -> PointerEvent {
        PointerEvent::Move {
            id,
            position: ClientPoint::new(x, y),
            pressed: true,
        }
    }

    fn up(id: i64, x: f64, y: f64) -> PointerEvent {
        PointerEvent::Up {
            id,
            position: ClientPoint::new(x, y),
        }
    }

    #[test]
    fn test_no_image_is_noop() {
        let mut engine = Engine::default();
        let l = layout(100.0, 100.0);
        engine.handle_pointer(down(1, 10.0, 10.0), &l);
        engine.handle_pointer(up(1, 10.0, 10.0), &l);
        assert!(engine.drain_events().is_empty());
        assert!(engine.snapshot().is_none());
        assert_eq!(engine.export_mask(), Err(EngineError::NoImage));
    }

    #[test]
    fn test_brush_paints_and_reports_mask() {
        let mut engine = engine_with_image(100, 100);
        engine.set_flags(ToolFlags {
            is_brush_active: true,
            brush_size: 10.0,
            ..Default::default()
        });
        let l = layout(100.0, 100.0);
        engine.handle_pointer(down(1, 20.0, 20.0), &l);
        engine.handle_pointer(mv(1, 60.0, 20.0), &l);
        engine.handle_pointer(up(1, 60.0, 20.0), &l);

        let mask = engine.mask().unwrap();
        assert!(mask.alpha_at(40, 20) > 0);
        assert_eq!(mask.alpha_at(40, 60), 0);
        let events = engine.drain_events();
        assert!(matches!(events.as_slice(), [EngineEvent::MaskChanged(_)]));
    }

    #[test]
    fn test_brush_subtract_mode() {
        let mut engine = engine_with_image(50, 50);
        let l = layout(50.0, 50.0);
        let mut flags = ToolFlags {
            is_brush_active: true,
            brush_size: 20.0,
            ..Default::default()
        };
        engine.set_flags(flags.clone());
        engine.handle_pointer(down(1, 25.0, 25.0), &l);
        engine.handle_pointer(up(1, 25.0, 25.0), &l);
        assert!(engine.mask().unwrap().alpha_at(25, 25) > 0);

        flags.mask_selection_mode = SelectionMode::Subtract;
        engine.set_flags(flags);
        engine.handle_pointer(down(1, 25.0, 25.0), &l);
        engine.handle_pointer(up(1, 25.0, 25.0), &l);
        assert_eq!(engine.mask().unwrap().alpha_at(25, 25), 0);
    }

    #[test]
    fn test_second_pointer_restores_mask() {
        let mut engine = engine_with_image(100, 100);
        engine.set_flags(ToolFlags {
            is_brush_active: true,
            brush_size: 10.0,
            ..Default::default()
        });
        let l = layout(100.0, 100.0);
        engine.handle_pointer(down(1, 20.0, 20.0), &l);
        engine.handle_pointer(mv(1, 40.0, 20.0), &l);
        engine.handle_pointer(down(2, 80.0, 80.0), &l);
        assert!(engine.mask().unwrap().is_empty());
        engine.handle_pointer(up(2, 80.0, 80.0), &l);
        engine.handle_pointer(mv(1, 50.0, 50.0), &l);
        engine.handle_pointer(up(1, 50.0, 50.0), &l);
        assert!(engine.mask().unwrap().is_empty());
        assert!(engine.drain_events().is_empty());
    }

    #[test]
    fn test_point_workflow_tap_and_remove() {
        let mut engine = engine_with_image(200, 200);
        engine.set_flags(ToolFlags {
            active_menu: MenuKind::AddSubtract,
            click_mode: Some(ClickMode::Add),
            ..Default::default()
        });
        engine.set_points(PointSet {
            foreground: vec![ImagePoint::new(150.0, 150.0)],
            background: vec![ImagePoint::new(20.0, 20.0)],
        });
        let l = layout(200.0, 200.0);

        engine.handle_pointer(down(1, 25.0, 22.0), &l);
        engine.handle_pointer(up(1, 25.0, 22.0), &l);
        engine.handle_pointer(down(1, 100.0, 100.0), &l);
        engine.handle_pointer(up(1, 101.0, 100.0), &l);

        let events = engine.drain_events();
        assert_eq!(
            events[0],
            EngineEvent::PointRemove {
                kind: crate::polygon::PointLabel::Background,
                index: 0
            }
        );
        assert!(matches!(events[1], EngineEvent::PointClick { .. }));
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_point_trail_throttled() {
        let mut engine = engine_with_image(200, 200);
        engine.set_flags(ToolFlags {
            active_menu: MenuKind::AddSubtract,
            click_mode: Some(ClickMode::Select),
            ..Default::default()
        });
        let l = layout(200.0, 200.0);
        engine.handle_pointer(down(1, 10.0, 10.0), &l);
        for x in 20..30 {
            engine.handle_pointer(mv(1, f64::from(x) * 5.0, 10.0), &l);
        }
        engine.handle_pointer(up(1, 150.0, 10.0), &l);
        let clicks = engine
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, EngineEvent::PointClick { .. }))
            .count();
        assert_eq!(clicks, 1);
    }

    #[test]
    fn test_drag_vector() {
        let mut engine = engine_with_image(100, 100);
        engine.set_flags(ToolFlags {
            active_tool: Some(ToolKind::Drag),
            ..Default::default()
        });
        let l = layout(200.0, 200.0);
        engine.handle_pointer(down(1, 20.0, 20.0), &l);
        engine.handle_pointer(mv(1, 100.0, 60.0), &l);
        assert!(matches!(
            engine.snapshot().unwrap().overlay,
            ToolOverlay::DragVector { .. }
        ));
        engine.handle_pointer(up(1, 100.0, 60.0), &l);
        assert_eq!(
            engine.drain_events(),
            vec![EngineEvent::DragEnd {
                start: ImagePoint::new(10.0, 10.0),
                end: ImagePoint::new(50.0, 30.0),
            }]
        );
    }

    #[test]
    fn test_quill_commit() {
        let mut engine = engine_with_image(100, 100);
        engine.set_flags(ToolFlags {
            quill_mode: Some(QuillMode::Add),
            brush_size: 6.0,
            ..Default::default()
        });
        let l = layout(100.0, 100.0);
        engine.handle_pointer(down(1, 10.0, 10.0), &l);
        engine.handle_pointer(mv(1, 11.0, 10.0), &l);
        engine.handle_pointer(mv(1, 30.0, 10.0), &l);
        engine.handle_pointer(up(1, 30.0, 10.0), &l);
        assert_eq!(engine.strokes().len(), 1);
        assert_eq!(engine.strokes()[0].points.len(), 2);
        assert!((engine.strokes()[0].width - 6.0).abs() < f64::EPSILON);
        assert!(matches!(
            engine.drain_events().as_slice(),
            [EngineEvent::StrokesChanged(list)] if list.len() == 1
        ));
    }

    #[test]
    fn test_tool_switch_cancels_quill() {
        let mut engine = engine_with_image(100, 100);
        let flags = ToolFlags {
            quill_mode: Some(QuillMode::Color),
            ..Default::default()
        };
        engine.set_flags(flags);
        let l = layout(100.0, 100.0);
        engine.handle_pointer(down(1, 10.0, 10.0), &l);
        engine.handle_pointer(mv(1, 30.0, 10.0), &l);
        engine.set_flags(ToolFlags::default());
        engine.handle_pointer(up(1, 30.0, 10.0), &l);
        assert!(engine.strokes().is_empty());
        assert!(engine.drain_events().is_empty());
    }

    #[test]
    fn test_move_without_mask_reports_nothing_to_move() {
        let mut engine = engine_with_image(50, 50);
        engine.set_flags(ToolFlags {
            active_tool: Some(ToolKind::Move),
            ..Default::default()
        });
        assert!(engine.selection().is_none());
        assert_eq!(engine.drain_events(), vec![EngineEvent::NothingToMove]);
    }

    #[test]
    fn test_move_tap_outside_selection_clicks() {
        let mut engine = engine_with_image(100, 100);
        engine
            .mask_mut_for_test()
            .paint_stroke(&[ImagePoint::new(20.0, 20.0)], 10.0, PaintMode::Add);
        engine.set_flags(ToolFlags {
            active_tool: Some(ToolKind::Move),
            ..Default::default()
        });
        assert!(engine.selection().is_some());
        let l = layout(100.0, 100.0);
        engine.handle_pointer(down(1, 80.0, 80.0), &l);
        engine.handle_pointer(up(1, 80.0, 80.0), &l);
        assert!(matches!(
            engine.drain_events().as_slice(),
            [EngineEvent::PointClick { .. }]
        ));
        assert!(engine.selection().is_some());
    }

    #[test]
    fn test_leaving_move_drops_selection_and_reentry_rebuilds_it() {
        let mut engine = engine_with_image(100, 100);
        engine
            .mask_mut_for_test()
            .paint_stroke(&[ImagePoint::new(20.0, 20.0)], 10.0, PaintMode::Add);
        let move_tool = ToolFlags {
            active_tool: Some(ToolKind::Move),
            ..Default::default()
        };
        engine.set_flags(move_tool.clone());
        let l = layout(100.0, 100.0);
        engine.handle_pointer(down(1, 20.0, 20.0), &l);
        engine.handle_pointer(mv(1, 40.0, 20.0), &l);
        assert!(engine.selection().unwrap().offset().x > 0.0);

        engine.set_flags(ToolFlags {
            active_tool: Some(ToolKind::Drag),
            ..Default::default()
        });
        assert!(engine.selection().is_none());

        engine.set_flags(move_tool);
        let selection = engine.selection().unwrap();
        assert!(selection.offset().x.abs() < f64::EPSILON);
        assert!(selection.contains(ImagePoint::new(20.0, 20.0)));
    }

    #[test]
    fn test_new_image_resets_mask_and_view() {
        let mut engine = engine_with_image(40, 40);
        engine
            .mask_mut_for_test()
            .paint_stroke(&[ImagePoint::new(20.0, 20.0)], 10.0, PaintMode::Add);
        engine.view.scale = 2.0;
        engine
            .set_base_image(ImageBuffer::filled(60, 30, [0, 0, 0, 255]).unwrap())
            .unwrap();
        let mask = engine.mask().unwrap();
        assert_eq!((mask.width(), mask.height()), (60, 30));
        assert!(mask.is_empty());
        assert!(engine.view().is_identity());
    }

    #[test]
    fn test_raster_mode_seeds_from_polygons() {
        let mut engine = engine_with_image(100, 100);
        engine.set_polygons(vec![Polygon::new(vec![
            ImagePoint::new(10.0, 10.0),
            ImagePoint::new(30.0, 10.0),
            ImagePoint::new(30.0, 30.0),
        ])]);
        assert!(engine.mask().unwrap().is_empty());
        engine.set_flags(ToolFlags {
            active_menu: MenuKind::Assistant,
            ..Default::default()
        });
        assert!(!engine.mask().unwrap().is_empty());
    }

    #[test]
    fn test_export_working_mask_uses_config_resolution() {
        let config = EngineConfig {
            working_resolution: crate::config::Resolution::new(50, 25),
            ..Default::default()
        };
        let mut engine = Engine::new(config);
        engine
            .set_base_image(ImageBuffer::filled(100, 100, [100, 100, 100, 255]).unwrap())
            .unwrap();
        engine.set_polygons(vec![Polygon::new(vec![
            ImagePoint::new(0.0, 0.0),
            ImagePoint::new(50.0, 0.0),
            ImagePoint::new(50.0, 100.0),
            ImagePoint::new(0.0, 100.0),
        ])]);
        engine.seed_mask_from_polygons().unwrap();

        let file = engine.export_working_mask().unwrap();
        assert_eq!((file.width, file.height), (50, 25));
        let decoded = raster::decode_rgba(&file.png).unwrap();
        assert_eq!(decoded.get_pixel(5, 12).0, [255, 255, 255, 255]);
        assert_eq!(decoded.get_pixel(45, 12).0, [0, 0, 0, 255]);
    }

    impl Engine {
        fn mask_mut_for_test(&mut self) -> &mut MaskSurface {
            &mut self.session.as_mut().unwrap().mask
        }
    }
}
