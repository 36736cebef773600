//! Look direction, kept in three frames at once, and the model-view
//! matrix built from it.

use std::fmt;
use std::str::FromStr;

use nalgebra::{Matrix4, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::NavError;
use crate::transforms::{Frame, FrameTransforms};

/// Which frame keeps "up" on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MountMode {
    /// Up follows the local zenith; the horizon stays level.
    #[default]
    #[serde(rename = "horizon")]
    AltAzimuthal,
    /// Up follows the celestial pole.
    #[serde(rename = "equator")]
    Equatorial,
}

impl MountMode {
    pub fn as_config_str(&self) -> &'static str {
        match self {
            MountMode::AltAzimuthal => "horizon",
            MountMode::Equatorial => "equator",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            MountMode::AltAzimuthal => MountMode::Equatorial,
            MountMode::Equatorial => MountMode::AltAzimuthal,
        }
    }
}

impl FromStr for MountMode {
    type Err = NavError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equator" => Ok(MountMode::Equatorial),
            "horizon" => Ok(MountMode::AltAzimuthal),
            other => Err(NavError::UnknownMountMode(other.to_owned())),
        }
    }
}

impl fmt::Display for MountMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_config_str())
    }
}

/// Screen basis in alt-az coordinates: columns are side, up and back
/// (`s`, `u`, `-f`), no translation.
pub fn model_view_matrix(
    alt_az: &Vector3<f64>,
    equatorial: &Vector3<f64>,
    transforms: &FrameTransforms,
    mount: MountMode,
) -> Matrix4<f64> {
    let mut f = match mount {
        MountMode::Equatorial => *equatorial,
        MountMode::AltAzimuthal => *alt_az,
    }
    .normalize();
    let mut s = Vector3::new(f.y, -f.x, 0.0);
    if s.norm_squared() < f64::EPSILON {
        // Looking straight along the pole of the mount frame.
        s = Vector3::new(0.0, -1.0, 0.0);
    }

    if mount == MountMode::Equatorial {
        f = alt_az.normalize();
        s = transforms.equ_to_alt_az().transform_vector(&s);
    }

    let mut u = s.cross(&f);
    s.normalize_mut();
    u.normalize_mut();

    Matrix4::new(
        s.x, u.x, -f.x, 0.0, //
        s.y, u.y, -f.y, 0.0, //
        s.z, u.z, -f.z, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    )
}

/// The look direction in alt-az, equatorial-of-date and J2000 frames.
///
/// Whichever frame was set last is the anchor: when the frame matrices
/// change, the anchor vector is kept and the other two are re-derived.
#[derive(Debug, Clone, PartialEq)]
pub struct VisionDirection {
    alt_az: Vector3<f64>,
    equatorial: Vector3<f64>,
    j2000: Vector3<f64>,
    anchor: Frame,
    model_view: Matrix4<f64>,
}

impl VisionDirection {
    pub fn new(
        frame: Frame,
        direction: Vector3<f64>,
        transforms: &FrameTransforms,
        mount: MountMode,
    ) -> Self {
        let mut vision = Self {
            alt_az: Vector3::x(),
            equatorial: Vector3::x(),
            j2000: Vector3::x(),
            anchor: Frame::AltAz,
            model_view: Matrix4::identity(),
        };
        vision.set(frame, direction, transforms, mount);
        vision
    }

    /// Store `direction` in `frame`, derive the other representations and
    /// rebuild the model-view matrix. Directions given in a frame other than
    /// the three tracked ones are converted to equatorial of date first.
    pub fn set(
        &mut self,
        frame: Frame,
        direction: Vector3<f64>,
        transforms: &FrameTransforms,
        mount: MountMode,
    ) {
        match frame {
            Frame::AltAz => self.alt_az = direction,
            Frame::EquatorialOfDate => self.equatorial = direction,
            Frame::J2000 => self.j2000 = direction,
            Frame::HeliocentricEcliptic | Frame::Galactic => {
                let equ = transforms.convert_direction(frame, Frame::EquatorialOfDate, &direction);
                return self.set(Frame::EquatorialOfDate, equ, transforms, mount);
            }
        }
        self.anchor = frame;
        self.refresh(transforms, mount);
    }

    /// Re-derive the non-anchor representations from fresh matrices.
    pub fn refresh(&mut self, transforms: &FrameTransforms, mount: MountMode) {
        match self.anchor {
            Frame::AltAz => {
                self.equatorial = transforms.alt_az_to_equ().transform_vector(&self.alt_az);
                self.j2000 = transforms.equ_to_j2000().transform_vector(&self.equatorial);
            }
            Frame::J2000 => {
                self.equatorial = transforms.j2000_to_equ().transform_vector(&self.j2000);
                self.alt_az = transforms.equ_to_alt_az().transform_vector(&self.equatorial);
            }
            _ => {
                self.j2000 = transforms.equ_to_j2000().transform_vector(&self.equatorial);
                self.alt_az = transforms.equ_to_alt_az().transform_vector(&self.equatorial);
            }
        }
        self.rebuild_model_view(transforms, mount);
    }

    pub fn rebuild_model_view(&mut self, transforms: &FrameTransforms, mount: MountMode) {
        self.model_view = model_view_matrix(&self.alt_az, &self.equatorial, transforms, mount);
    }

    pub fn alt_az(&self) -> &Vector3<f64> {
        &self.alt_az
    }

    pub fn equatorial(&self) -> &Vector3<f64> {
        &self.equatorial
    }

    pub fn j2000(&self) -> &Vector3<f64> {
        &self.j2000
    }

    pub fn anchor(&self) -> Frame {
        self.anchor
    }

    pub fn model_view(&self) -> &Matrix4<f64> {
        &self.model_view
    }
}
