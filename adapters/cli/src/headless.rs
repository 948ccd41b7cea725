use std::time::Duration;

use anyhow::Result;
use kinetic_perimetry_rendering::{FrameInput, Presentation, RenderingBackend, Scene};

use crate::script::{Script, ScriptCommand};

/// Backend that replays a script at a fixed frame step without a window.
#[derive(Debug)]
pub(crate) struct HeadlessBackend {
    frame: Duration,
    time_limit: Duration,
    script: Script,
}

impl HeadlessBackend {
    pub(crate) fn new(frame: Duration, time_limit: Duration, script: Script) -> Self {
        Self {
            frame,
            time_limit,
            script,
        }
    }
}

impl RenderingBackend for HeadlessBackend {
    fn run<F>(self, presentation: Presentation, mut update_scene: F) -> Result<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene),
    {
        let Self {
            frame,
            time_limit,
            script,
        } = self;
        let Presentation {
            window_title,
            scene,
            ..
        } = presentation;

        tracing::info!(
            title = %window_title,
            frame_ms = frame.as_millis(),
            events = script.events().len(),
            "headless replay started"
        );

        let mut scene = scene;
        let mut pending = script.events().iter().peekable();
        let mut view_deg = None;
        let mut elapsed = Duration::ZERO;
        let mut dt = Duration::ZERO;
        let mut frames = 0_u64;

        loop {
            let now_secs = elapsed.as_secs_f64();
            let mut input = FrameInput::default();
            while let Some(event) = pending.next_if(|event| event.at_secs <= now_secs) {
                match event.command {
                    ScriptCommand::Start => input.start = true,
                    ScriptCommand::Pause => input.pause = true,
                    ScriptCommand::Resume => input.resume = true,
                    ScriptCommand::Detect => input.detect = true,
                    ScriptCommand::View { pitch_deg, yaw_deg } => {
                        view_deg = Some((pitch_deg, yaw_deg));
                    }
                }
            }
            input.view_deg = view_deg;

            update_scene(dt, input, &mut scene);
            frames += 1;

            if scene.is_finished() {
                break;
            }
            if elapsed >= time_limit {
                tracing::warn!(
                    limit_secs = time_limit.as_secs_f64(),
                    status = %scene.status,
                    "replay stopped at the time limit"
                );
                break;
            }

            dt = frame;
            elapsed += frame;
        }

        tracing::info!(
            frames,
            elapsed_secs = elapsed.as_secs_f64(),
            responses = scene.responses,
            "headless replay finished"
        );
        Ok(())
    }
}
