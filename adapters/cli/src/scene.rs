use kinetic_perimetry_rendering::{
    CameraPresentation, Color, FocusMarkerPresentation, MeridianPolyline, RenderingError, Scene,
    StimulusPresentation,
};
use kinetic_perimetry_session::SessionFrame;
use kinetic_perimetry_system_sequencer::StimulusSequencer;

pub(crate) const CLEAR_COLOR: Color = Color::from_rgb_u8(8, 10, 24);
const STIMULUS_COLOR: Color = Color::from_rgb_u8(255, 250, 225);
const FOCUS_COLOR: Color = Color::from_rgb_u8(255, 214, 90);
const MERIDIAN_COLOR: Color = Color::from_rgb_u8(70, 80, 110);
const REFERENCE_COLOR: Color = Color::from_rgb_u8(200, 60, 60);

/// Scene shown before the first frame.
pub(crate) fn initial_scene(
    sequencer: &StimulusSequencer,
    focus: FocusMarkerPresentation,
) -> Result<Scene, RenderingError> {
    Ok(Scene::new(
        CameraPresentation::default(),
        focus,
        meridian_polylines(sequencer)?,
        (MERIDIAN_COLOR, REFERENCE_COLOR),
    ))
}

/// Focus marker styled for the scene.
pub(crate) fn focus_marker(frame: &SessionFrame) -> FocusMarkerPresentation {
    FocusMarkerPresentation {
        position: frame.focus_position,
        scale: frame.focus_scale,
        color: FOCUS_COLOR,
    }
}

/// Guide lines for every configured meridian; the first one is the reference.
pub(crate) fn meridian_polylines(
    sequencer: &StimulusSequencer,
) -> Result<Vec<MeridianPolyline>, RenderingError> {
    sequencer
        .meridians()
        .iter()
        .enumerate()
        .map(|(index, meridian)| {
            MeridianPolyline::new(
                *meridian,
                sequencer.meridian_line(*meridian).collect(),
                index == 0,
            )
        })
        .collect()
}

/// Copies one session frame into the scene.
pub(crate) fn apply_frame(
    scene: &mut Scene,
    frame: &SessionFrame,
    sequencer: &StimulusSequencer,
    view_deg: Option<(f64, f64)>,
) -> Result<(), RenderingError> {
    if let Some((pitch_deg, yaw_deg)) = view_deg {
        scene.camera.pitch_deg = pitch_deg;
        scene.camera.yaw_deg = yaw_deg;
    }
    scene.stimulus = frame
        .stimulus
        .map(|stimulus| StimulusPresentation::new(stimulus.position, stimulus.size, STIMULUS_COLOR));
    scene.focus_marker = focus_marker(frame);
    scene.meridians = meridian_polylines(sequencer)?;
    scene.status = frame.status;
    scene.responses = sequencer.response_log().len();
    Ok(())
}
