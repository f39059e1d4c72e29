//! A headless editing session: one engine, one render loop, one output dir.

use crate::error::{self, CliError, CliResult};
use crate::script::{LayoutSpec, Script, Step};
use kurbo::{Rect, Size};
use maskcraft_core::{
    Engine, EngineConfig, EngineEvent, ImageBuffer, ImagePoint, MaskFile, PointLabel, SurfaceBox,
};
use maskcraft_render::{RenderLoop, RenderStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Serializable form of an engine event for `events.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventRecord {
    PointClick {
        image: ImagePoint,
        display: [f64; 2],
    },
    PointRemove {
        kind: PointLabel,
        index: usize,
    },
    DragEnd {
        start: ImagePoint,
        end: ImagePoint,
    },
    StrokesChanged {
        count: usize,
    },
    MaskChanged {
        width: u32,
        height: u32,
    },
    MaskRejected {
        reason: String,
    },
    NothingToMove,
}

impl From<&EngineEvent> for EventRecord {
    fn from(event: &EngineEvent) -> Self {
        match event {
            EngineEvent::PointClick { image, display } => EventRecord::PointClick {
                image: *image,
                display: [display.x(), display.y()],
            },
            EngineEvent::PointRemove { kind, index } => EventRecord::PointRemove {
                kind: *kind,
                index: *index,
            },
            EngineEvent::DragEnd { start, end } => EventRecord::DragEnd {
                start: *start,
                end: *end,
            },
            EngineEvent::StrokesChanged(strokes) => EventRecord::StrokesChanged {
                count: strokes.len(),
            },
            EngineEvent::MaskChanged(file) => EventRecord::MaskChanged {
                width: file.width,
                height: file.height,
            },
            EngineEvent::MaskRejected { reason } => EventRecord::MaskRejected {
                reason: reason.clone(),
            },
            EngineEvent::NothingToMove => EventRecord::NothingToMove,
        }
    }
}

/// Paths written by [`Session::write_artifacts`].
#[derive(Debug, Clone, PartialEq)]
pub struct Artifacts {
    pub frame: PathBuf,
    pub mask: PathBuf,
    pub strokes: PathBuf,
    pub events: PathBuf,
}

pub struct Session {
    engine: Engine,
    frames: RenderLoop,
    container: Rect,
    out_dir: PathBuf,
    events: Vec<EventRecord>,
}

impl Session {
    /// Start a session on a decoded base image.
    pub fn open(image_bytes: &[u8], config: EngineConfig, out_dir: &Path) -> CliResult<Self> {
        let image = ImageBuffer::decode(image_bytes)?;
        let container = Rect::new(0.0, 0.0, f64::from(image.width()), f64::from(image.height()));
        let style = RenderStyle::from_config(&config);
        let mut engine = Engine::new(config);
        engine.set_base_image(image)?;
        std::fs::create_dir_all(out_dir).map_err(|source| CliError::Io {
            path: out_dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            engine,
            frames: RenderLoop::new(style),
            container,
            out_dir: out_dir.to_path_buf(),
            events: Vec::new(),
        })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    pub fn set_layout(&mut self, layout: LayoutSpec) {
        self.container = layout.to_rect();
    }

    /// The container box the next pointer event is mapped against.
    pub fn surface_box(&self) -> SurfaceBox {
        let buffer = self
            .engine
            .image()
            .map_or(Size::ZERO, |image| image.size());
        SurfaceBox::new(self.container, buffer)
    }

    pub fn load_mask(&mut self, bytes: &[u8]) -> CliResult<()> {
        self.engine.load_external_mask(bytes)?;
        self.collect_events();
        Ok(())
    }

    /// Replay a whole script. Relative paths resolve against `base_dir`.
    pub fn run_script(&mut self, script: &Script, base_dir: &Path) -> CliResult<()> {
        if let Some(layout) = script.layout {
            self.set_layout(layout);
        }
        for (i, step) in script.steps.iter().enumerate() {
            log::debug!("step {}: {:?}", i, step);
            self.apply(step, base_dir)?;
        }
        Ok(())
    }

    pub fn apply(&mut self, step: &Step, base_dir: &Path) -> CliResult<()> {
        match step {
            Step::Flags { flags } => self.engine.set_flags(flags.clone()),
            Step::Pointer { event } => {
                let surface = self.surface_box();
                self.engine.handle_pointer(*event, &surface);
            }
            Step::Layout { layout } => self.set_layout(*layout),
            Step::Polygons { polygons } => self.engine.set_polygons(polygons.clone()),
            Step::Points { points } => self.engine.set_points(points.clone()),
            Step::Strokes { strokes } => self.engine.set_strokes(strokes.clone()),
            Step::ClearStrokes => self.engine.clear_strokes(),
            Step::SeedMask => self.engine.seed_mask_from_polygons()?,
            Step::LoadMask { path } => {
                let bytes = error::read(&base_dir.join(path))?;
                self.engine.load_external_mask(&bytes)?;
            }
            Step::Render { name } => {
                self.render_to(&format!("{name}.png"))?;
            }
        }
        self.collect_events();
        Ok(())
    }

    fn collect_events(&mut self) {
        for event in self.engine.drain_events() {
            let record = EventRecord::from(&event);
            log::info!("event: {:?}", record);
            self.events.push(record);
        }
    }

    /// Render the current frame into the output directory.
    pub fn render_to(&mut self, file_name: &str) -> CliResult<Option<PathBuf>> {
        let Some(frame) = self.frames.tick(&self.engine)? else {
            return Ok(None);
        };
        let png = frame.to_png()?;
        let path = self.out_dir.join(file_name);
        error::write(&path, &png)?;
        log::info!("wrote {}", path.display());
        Ok(Some(path))
    }

    /// Write the final frame, mask, committed strokes and event log.
    pub fn write_artifacts(&mut self) -> CliResult<Artifacts> {
        let frame = self
            .render_to("frame.png")?
            .unwrap_or_else(|| self.out_dir.join("frame.png"));

        let mask_file = self.engine.export_mask()?;
        let mask = self.out_dir.join(MaskFile::FILE_NAME);
        error::write(&mask, &mask_file.png)?;

        let strokes = self.out_dir.join("strokes.json");
        error::write(&strokes, serde_json::to_string_pretty(self.engine.strokes())?.as_bytes())?;

        let events = self.out_dir.join("events.json");
        error::write(&events, serde_json::to_string_pretty(&self.events)?.as_bytes())?;

        Ok(Artifacts {
            frame,
            mask,
            strokes,
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maskcraft_core::{ClientPoint, PointerEvent, ToolFlags, raster};

    fn png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        let data: Vec<u8> = std::iter::repeat_n(rgba, (width * height) as usize)
            .flatten()
            .collect();
        raster::encode_png(width, height, &data).unwrap()
    }

    #[test]
    fn test_brush_session_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let mut session =
            Session::open(&png(32, 32, [90, 90, 90, 255]), EngineConfig::default(), dir.path())
                .unwrap();
        let script = Script {
            layout: None,
            steps: vec![
                Step::Flags {
                    flags: ToolFlags {
                        is_brush_active: true,
                        brush_size: 8.0,
                        ..Default::default()
                    },
                },
                Step::Pointer {
                    event: PointerEvent::Down {
                        id: 1,
                        position: ClientPoint::new(10.0, 10.0),
                    },
                },
                Step::Pointer {
                    event: PointerEvent::Up {
                        id: 1,
                        position: ClientPoint::new(20.0, 10.0),
                    },
                },
            ],
        };
        session.run_script(&script, dir.path()).unwrap();
        assert_eq!(
            session.events(),
            &[EventRecord::MaskChanged {
                width: 32,
                height: 32
            }]
        );

        let artifacts = session.write_artifacts().unwrap();
        assert!(artifacts.frame.exists());
        let mask = raster::decode_rgba(&std::fs::read(&artifacts.mask).unwrap()).unwrap();
        assert_eq!(mask.get_pixel(10, 10).0, [255, 255, 255, 255]);
        assert_eq!(mask.get_pixel(30, 30).0, [0, 0, 0, 255]);
        assert_eq!(std::fs::read_to_string(&artifacts.strokes).unwrap().trim(), "[]");
    }

    #[test]
    fn test_mask_artifact_tracks_later_seed() {
        let dir = tempfile::tempdir().unwrap();
        let mut session =
            Session::open(&png(50, 50, [0, 0, 0, 255]), EngineConfig::default(), dir.path())
                .unwrap();
        let square = maskcraft_core::Polygon::new(vec![
            ImagePoint::new(30.0, 30.0),
            ImagePoint::new(49.0, 30.0),
            ImagePoint::new(49.0, 49.0),
            ImagePoint::new(30.0, 49.0),
        ]);
        let script = Script {
            layout: None,
            steps: vec![
                Step::Flags {
                    flags: ToolFlags {
                        is_brush_active: true,
                        brush_size: 6.0,
                        ..Default::default()
                    },
                },
                Step::Pointer {
                    event: PointerEvent::Down {
                        id: 1,
                        position: ClientPoint::new(5.0, 5.0),
                    },
                },
                Step::Pointer {
                    event: PointerEvent::Up {
                        id: 1,
                        position: ClientPoint::new(5.0, 5.0),
                    },
                },
                Step::Polygons {
                    polygons: vec![square],
                },
                Step::SeedMask,
            ],
        };
        session.run_script(&script, dir.path()).unwrap();
        assert_eq!(session.engine().mask().unwrap().alpha_at(5, 5), 0);

        let artifacts = session.write_artifacts().unwrap();
        let mask = raster::decode_rgba(&std::fs::read(&artifacts.mask).unwrap()).unwrap();
        assert_eq!(mask.get_pixel(5, 5).0, [0, 0, 0, 255]);
        assert_eq!(mask.get_pixel(45, 45).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_layout_step_scales_pointer() {
        let dir = tempfile::tempdir().unwrap();
        let mut session =
            Session::open(&png(50, 50, [0, 0, 0, 255]), EngineConfig::default(), dir.path())
                .unwrap();
        session.set_layout(LayoutSpec {
            x: 100.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
        });
        session
            .apply(
                &Step::Flags {
                    flags: ToolFlags {
                        active_tool: Some(maskcraft_core::ToolKind::Drag),
                        ..Default::default()
                    },
                },
                dir.path(),
            )
            .unwrap();
        for event in [
            PointerEvent::Down {
                id: 1,
                position: ClientPoint::new(120.0, 20.0),
            },
            PointerEvent::Up {
                id: 1,
                position: ClientPoint::new(160.0, 20.0),
            },
        ] {
            session.apply(&Step::Pointer { event }, dir.path()).unwrap();
        }
        assert_eq!(
            session.events(),
            &[EventRecord::DragEnd {
                start: ImagePoint::new(10.0, 10.0),
                end: ImagePoint::new(30.0, 10.0),
            }]
        );
    }

    #[test]
    fn test_missing_mask_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut session =
            Session::open(&png(8, 8, [0, 0, 0, 255]), EngineConfig::default(), dir.path())
                .unwrap();
        let err = session
            .apply(
                &Step::LoadMask {
                    path: PathBuf::from("missing.png"),
                },
                dir.path(),
            )
            .unwrap_err();
        assert!(matches!(err, CliError::Io { ref path, .. } if path.ends_with("missing.png")));
    }

    #[test]
    fn test_render_step_writes_named_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut session =
            Session::open(&png(8, 8, [5, 6, 7, 255]), EngineConfig::default(), dir.path())
                .unwrap();
        session
            .apply(
                &Step::Render {
                    name: "preview".into(),
                },
                dir.path(),
            )
            .unwrap();
        assert!(dir.path().join("preview.png").exists());
    }
}
