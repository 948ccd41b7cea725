#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for kinetic perimetry adapters.

use anyhow::Result as AnyResult;
use glam::{DQuat, Vec2};
use kinetic_perimetry_core::{Direction3, SequencerStatus, StimulusSize};
use std::{error::Error, fmt, time::Duration};

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }
}

/// Input snapshot gathered by adapters before updating the scene.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct FrameInput {
    /// Camera pitch and yaw in degrees, when the adapter tracks the view.
    pub view_deg: Option<(f64, f64)>,
    /// Whether the examination start was requested on this frame.
    pub start: bool,
    /// Whether a pause was requested on this frame.
    pub pause: bool,
    /// Whether a resume was requested on this frame.
    pub resume: bool,
    /// Whether the subject reported seeing the stimulus on this frame.
    pub detect: bool,
}

/// Perspective camera looking out from the subject at the origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPresentation {
    /// Rotation about the horizontal axis in degrees.
    pub pitch_deg: f64,
    /// Rotation about the vertical axis in degrees.
    pub yaw_deg: f64,
    /// Vertical field of view in degrees.
    pub vertical_fov_deg: f64,
    /// Viewport width divided by height.
    pub aspect_ratio: f64,
}

impl Default for CameraPresentation {
    fn default() -> Self {
        Self {
            pitch_deg: 0.0,
            yaw_deg: 0.0,
            vertical_fov_deg: 60.0,
            aspect_ratio: 1.0,
        }
    }
}

impl CameraPresentation {
    /// Normalized device coordinates of `point`, or `None` when off screen.
    ///
    /// Zero pitch and yaw look down the negative Z axis.
    #[must_use]
    pub fn project(&self, point: Direction3) -> Option<Vec2> {
        let orientation = DQuat::from_rotation_y(-self.yaw_deg.to_radians())
            * DQuat::from_rotation_x(-self.pitch_deg.to_radians());
        let local = orientation.inverse() * point;
        if local.z >= 0.0 {
            return None;
        }

        let focal = (self.vertical_fov_deg.to_radians() * 0.5).tan();
        let depth = -local.z;
        let x = local.x / depth / focal / self.aspect_ratio;
        let y = local.y / depth / focal;
        if x.abs() > 1.0 || y.abs() > 1.0 {
            return None;
        }
        Some(Vec2::new(x as f32, y as f32))
    }
}

/// Stimulus disc drawn on the examination sphere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StimulusPresentation {
    /// Position of the disc center.
    pub position: Direction3,
    /// Goldmann size of the stimulus.
    pub size: StimulusSize,
    /// Radius of the disc, matching the size's angular extent at its distance.
    pub radius: f64,
    /// Physical area of the disc at its distance.
    pub area: f64,
    /// Color used to fill the disc.
    pub color: Color,
}

impl StimulusPresentation {
    /// Creates a stimulus disc sized for its distance from the subject.
    #[must_use]
    pub fn new(position: Direction3, size: StimulusSize, color: Color) -> Self {
        let distance = position.length();
        Self {
            position,
            size,
            radius: size.radius_at(distance),
            area: size.area_at(distance),
            color,
        }
    }
}

/// Pulsing focus marker the subject fixates on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FocusMarkerPresentation {
    /// Position of the marker.
    pub position: Direction3,
    /// Current, pulsed marker size.
    pub scale: f64,
    /// Color used to draw the marker.
    pub color: Color,
}

/// Meridian drawn as a polyline on the examination sphere.
#[derive(Clone, Debug, PartialEq)]
pub struct MeridianPolyline {
    /// Meridian angle in degrees.
    pub meridian_deg: f64,
    /// Sampled points from the outer edge to the field center.
    pub points: Vec<Direction3>,
    /// Whether this is the reference line drawn in a distinct color.
    pub reference: bool,
}

impl MeridianPolyline {
    /// Creates a polyline, rejecting lines without both endpoints.
    pub fn new(
        meridian_deg: f64,
        points: Vec<Direction3>,
        reference: bool,
    ) -> Result<Self, RenderingError> {
        if points.len() < 2 {
            return Err(RenderingError::DegeneratePolyline {
                meridian_deg,
                points: points.len(),
            });
        }

        Ok(Self {
            meridian_deg,
            points,
            reference,
        })
    }
}

/// Scene description combining the stimulus, the focus marker and meridians.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Camera the scene is viewed through.
    pub camera: CameraPresentation,
    /// Stimulus currently visible, if any.
    pub stimulus: Option<StimulusPresentation>,
    /// Focus marker.
    pub focus_marker: FocusMarkerPresentation,
    /// Meridian guide lines.
    pub meridians: Vec<MeridianPolyline>,
    /// Colors used for regular and reference meridians.
    pub meridian_colors: (Color, Color),
    /// Status of the examination.
    pub status: SequencerStatus,
    /// Number of responses recorded so far.
    pub responses: usize,
}

impl Scene {
    /// Creates a scene with no stimulus and no recorded responses.
    #[must_use]
    pub fn new(
        camera: CameraPresentation,
        focus_marker: FocusMarkerPresentation,
        meridians: Vec<MeridianPolyline>,
        meridian_colors: (Color, Color),
    ) -> Self {
        Self {
            camera,
            stimulus: None,
            focus_marker,
            meridians,
            meridian_colors,
            status: SequencerStatus::Ready,
            responses: 0,
        }
    }

    /// Returns `true` once every stimulus size has been examined.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.status == SequencerStatus::Done
    }

    /// Screen position of the stimulus, when it is drawn and in view.
    #[must_use]
    pub fn stimulus_on_screen(&self) -> Option<Vec2> {
        self.stimulus
            .and_then(|stimulus| self.camera.project(stimulus.position))
    }

    /// Color of `line`.
    #[must_use]
    pub fn meridian_color(&self, line: &MeridianPolyline) -> Color {
        if line.reference {
            self.meridian_colors.1
        } else {
            self.meridian_colors.0
        }
    }
}

/// Presentation descriptor consumed by rendering backends.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Title used by the created window.
    pub window_title: String,
    /// Solid color used to clear each frame.
    pub clear_color: Color,
    /// Scene content that should be displayed.
    pub scene: Scene,
}

impl Presentation {
    /// Constructs a new presentation descriptor.
    #[must_use]
    pub fn new<T>(window_title: T, clear_color: Color, scene: Scene) -> Self
    where
        T: Into<String>,
    {
        Self {
            window_title: window_title.into(),
            clear_color,
            scene,
        }
    }
}

/// Rendering backend capable of presenting perimetry scenes.
pub trait RenderingBackend {
    /// Runs the rendering backend until the examination finishes or the
    /// backend is requested to exit.
    ///
    /// The provided `update_scene` closure receives the frame delta, per-frame
    /// input captured by the adapter, and mutates the scene before it is
    /// rendered.
    fn run<F>(self, presentation: Presentation, update_scene: F) -> AnyResult<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene);
}

/// Errors that can occur when constructing rendering descriptors.
#[derive(Debug, PartialEq)]
pub enum RenderingError {
    /// Meridian polylines need at least two points.
    DegeneratePolyline {
        /// Meridian whose line was rejected.
        meridian_deg: f64,
        /// Number of points provided.
        points: usize,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DegeneratePolyline {
                meridian_deg,
                points,
            } => {
                write!(
                    f,
                    "meridian {meridian_deg} needs at least two points (received {points})"
                )
            }
        }
    }
}

impl Error for RenderingError {}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);

    fn marker() -> FocusMarkerPresentation {
        FocusMarkerPresentation {
            position: Direction3::new(0.0, 0.0, -25.0),
            scale: 0.75,
            color: WHITE,
        }
    }

    #[test]
    fn polyline_creation_rejects_single_points_without_panicking() {
        let error = MeridianPolyline::new(90.0, vec![Direction3::Z], false)
            .expect_err("single point must be rejected");

        assert_eq!(
            error,
            RenderingError::DegeneratePolyline {
                meridian_deg: 90.0,
                points: 1,
            }
        );
        assert_eq!(
            error.to_string(),
            "meridian 90 needs at least two points (received 1)"
        );
    }

    #[test]
    fn stimulus_radius_matches_angular_size() {
        let stimulus = StimulusPresentation::new(
            Direction3::new(0.0, 0.0, -50.0),
            StimulusSize::V,
            WHITE,
        );

        assert!((stimulus.radius - StimulusSize::V.radius_at(50.0)).abs() < 1e-12);
        assert!(stimulus.radius > StimulusSize::I.radius_at(50.0));
        let disc = std::f64::consts::PI * stimulus.radius * stimulus.radius;
        assert!((stimulus.area - disc).abs() < 1e-12);
        assert!((stimulus.area / StimulusSize::IV.area_at(50.0) - 4.0).abs() < 0.01);
    }

    #[test]
    fn camera_projects_points_ahead_to_the_screen_center() {
        let camera = CameraPresentation::default();

        let center = camera
            .project(Direction3::new(0.0, 0.0, -50.0))
            .expect("point ahead is visible");
        assert!(center.abs_diff_eq(Vec2::ZERO, 1e-6));
        assert_eq!(camera.project(Direction3::new(0.0, 0.0, 50.0)), None);
        assert_eq!(camera.project(Direction3::new(50.0, 0.0, -1.0)), None);
    }

    #[test]
    fn camera_follows_yaw_and_pitch() {
        let turned = CameraPresentation {
            yaw_deg: 90.0,
            ..CameraPresentation::default()
        };
        let ahead = turned
            .project(Direction3::new(10.0, 0.0, 0.0))
            .expect("point to the right is visible after turning");
        assert!(ahead.abs_diff_eq(Vec2::ZERO, 1e-6));

        let lowered = CameraPresentation {
            pitch_deg: 90.0,
            ..CameraPresentation::default()
        };
        let below = lowered
            .project(Direction3::new(0.0, -10.0, 0.0))
            .expect("point below is visible after pitching");
        assert!(below.abs_diff_eq(Vec2::ZERO, 1e-6));
    }

    #[test]
    fn reference_meridian_uses_the_highlight_color() {
        let highlight = Color::from_rgb_u8(220, 40, 40);
        let lines = vec![
            MeridianPolyline::new(0.0, vec![Direction3::X, Direction3::NEG_Z], true)
                .expect("two points"),
            MeridianPolyline::new(90.0, vec![Direction3::Y, Direction3::NEG_Z], false)
                .expect("two points"),
        ];
        let scene = Scene::new(
            CameraPresentation::default(),
            marker(),
            lines.clone(),
            (WHITE, highlight),
        );

        assert_eq!(scene.meridian_color(&lines[0]), highlight);
        assert_eq!(scene.meridian_color(&lines[1]), WHITE);
        assert!(!scene.is_finished());
        assert_eq!(scene.stimulus_on_screen(), None);
    }
}
