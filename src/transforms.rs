//! Homogeneous transforms between the navigator's reference frames.
//!
//! Frames:
//! - alt-az: observer-local horizon frame, origin on the body surface
//! - equatorial of date: home body equator, origin at the body centre
//! - J2000: Earth mean equator at J2000.0
//! - heliocentric ecliptic (VSOP87): origin at the Sun, units of AU
//! - galactic
//!
//! Every matrix is a rotation, possibly composed with translations, so
//! inverses are always taken by transposition of the rotation block.

use std::sync::LazyLock;

use nalgebra::{Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::observer::Observer;

// ---------- Matrix helpers ----------

pub fn x_rotation(angle_rad: f64) -> Matrix4<f64> {
    Matrix4::from_axis_angle(&Vector3::x_axis(), angle_rad)
}

pub fn y_rotation(angle_rad: f64) -> Matrix4<f64> {
    Matrix4::from_axis_angle(&Vector3::y_axis(), angle_rad)
}

pub fn z_rotation(angle_rad: f64) -> Matrix4<f64> {
    Matrix4::from_axis_angle(&Vector3::z_axis(), angle_rad)
}

pub fn translation(v: &Vector3<f64>) -> Matrix4<f64> {
    Matrix4::new_translation(v)
}

/// Inverse of a rotation-plus-translation matrix: `[Rᵀ | -Rᵀt]`.
pub fn rigid_inverse(m: &Matrix4<f64>) -> Matrix4<f64> {
    let rot_t = m.fixed_view::<3, 3>(0, 0).transpose();
    let t = m.fixed_view::<3, 1>(0, 3).into_owned();
    let mut inv = rot_t.to_homogeneous();
    inv.fixed_view_mut::<3, 1>(0, 3).copy_from(&(-(rot_t * t)));
    inv
}

// ---------- Fixed celestial constants ----------

/// J2000 equator to VSOP87 ecliptic: obliquity and frame bias (see vsop87.doc).
pub static MAT_J2000_TO_VSOP87: LazyLock<Matrix4<f64>> = LazyLock::new(|| {
    x_rotation((-23.439_280_305_555_555_6_f64).to_radians()) * z_rotation(0.000_027_5_f64.to_radians())
});

pub static MAT_VSOP87_TO_J2000: LazyLock<Matrix4<f64>> =
    LazyLock::new(|| MAT_J2000_TO_VSOP87.transpose());

/// J2000 equatorial to galactic (IAU 1958 pole, J2000 realisation).
#[rustfmt::skip]
pub static MAT_J2000_TO_GALACTIC: LazyLock<Matrix4<f64>> = LazyLock::new(|| {
    Matrix4::from_column_slice(&[
        -0.054_875_539_726, 0.494_109_453_312, -0.867_666_135_858, 0.0,
        -0.873_437_108_010, -0.444_829_589_425, -0.198_076_386_122, 0.0,
        -0.483_834_985_808, 0.746_982_251_810, 0.455_983_795_705, 0.0,
        0.0, 0.0, 0.0, 1.0,
    ])
});

pub static MAT_GALACTIC_TO_J2000: LazyLock<Matrix4<f64>> =
    LazyLock::new(|| MAT_J2000_TO_GALACTIC.transpose());

// ---------- Frames ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frame {
    AltAz,
    EquatorialOfDate,
    J2000,
    HeliocentricEcliptic,
    Galactic,
}

impl Frame {
    pub const ALL: [Frame; 5] = [
        Frame::AltAz,
        Frame::EquatorialOfDate,
        Frame::J2000,
        Frame::HeliocentricEcliptic,
        Frame::Galactic,
    ];
}

/// The full, mutually consistent set of frame matrices for one observer
/// at one instant. Only [`FrameTransforms::compute`] builds it, so a
/// partially updated set cannot exist.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameTransforms {
    alt_az_to_equ: Matrix4<f64>,
    equ_to_alt_az: Matrix4<f64>,
    equ_to_j2000: Matrix4<f64>,
    j2000_to_equ: Matrix4<f64>,
    j2000_to_alt_az: Matrix4<f64>,
    alt_az_to_j2000: Matrix4<f64>,
    helio_to_equ: Matrix4<f64>,
    equ_to_helio: Matrix4<f64>,
    alt_az_to_helio: Matrix4<f64>,
    helio_to_alt_az: Matrix4<f64>,
    equ_to_galactic: Matrix4<f64>,
    galactic_to_equ: Matrix4<f64>,
}

impl FrameTransforms {
    pub fn compute(observer: &Observer, jd: f64) -> Self {
        let alt_az_to_equ = observer.rot_alt_az_to_equatorial(jd);
        let equ_to_alt_az = alt_az_to_equ.transpose();

        let equ_to_j2000 = *MAT_VSOP87_TO_J2000 * observer.rot_equatorial_to_vsop87();
        let j2000_to_equ = equ_to_j2000.transpose();
        let j2000_to_alt_az = equ_to_alt_az * j2000_to_equ;
        let alt_az_to_j2000 = j2000_to_alt_az.transpose();

        let center = observer.center_position();
        let helio_to_equ = j2000_to_equ * *MAT_VSOP87_TO_J2000 * translation(&-center);
        let equ_to_helio = rigid_inverse(&helio_to_equ);

        // Alt-az origin sits on the surface, one body radius (plus altitude)
        // above the centre along the local vertical.
        let alt_az_to_vsop87 = *MAT_J2000_TO_VSOP87 * equ_to_j2000 * alt_az_to_equ;
        let vertical = Vector3::new(0.0, 0.0, observer.distance_from_center());
        let alt_az_to_helio = translation(&center) * alt_az_to_vsop87 * translation(&vertical);
        let helio_to_alt_az = rigid_inverse(&alt_az_to_helio);

        let equ_to_galactic = *MAT_J2000_TO_GALACTIC * equ_to_j2000;
        let galactic_to_equ = equ_to_galactic.transpose();

        Self {
            alt_az_to_equ,
            equ_to_alt_az,
            equ_to_j2000,
            j2000_to_equ,
            j2000_to_alt_az,
            alt_az_to_j2000,
            helio_to_equ,
            equ_to_helio,
            alt_az_to_helio,
            helio_to_alt_az,
            equ_to_galactic,
            galactic_to_equ,
        }
    }

    pub fn alt_az_to_equ(&self) -> &Matrix4<f64> {
        &self.alt_az_to_equ
    }
    pub fn equ_to_alt_az(&self) -> &Matrix4<f64> {
        &self.equ_to_alt_az
    }
    pub fn equ_to_j2000(&self) -> &Matrix4<f64> {
        &self.equ_to_j2000
    }
    pub fn j2000_to_equ(&self) -> &Matrix4<f64> {
        &self.j2000_to_equ
    }
    pub fn j2000_to_alt_az(&self) -> &Matrix4<f64> {
        &self.j2000_to_alt_az
    }
    pub fn alt_az_to_j2000(&self) -> &Matrix4<f64> {
        &self.alt_az_to_j2000
    }
    pub fn helio_to_equ(&self) -> &Matrix4<f64> {
        &self.helio_to_equ
    }
    pub fn equ_to_helio(&self) -> &Matrix4<f64> {
        &self.equ_to_helio
    }
    pub fn alt_az_to_helio(&self) -> &Matrix4<f64> {
        &self.alt_az_to_helio
    }
    pub fn helio_to_alt_az(&self) -> &Matrix4<f64> {
        &self.helio_to_alt_az
    }
    pub fn equ_to_galactic(&self) -> &Matrix4<f64> {
        &self.equ_to_galactic
    }
    pub fn galactic_to_equ(&self) -> &Matrix4<f64> {
        &self.galactic_to_equ
    }
    pub fn j2000_to_vsop87(&self) -> &Matrix4<f64> {
        &MAT_J2000_TO_VSOP87
    }
    pub fn vsop87_to_j2000(&self) -> &Matrix4<f64> {
        &MAT_VSOP87_TO_J2000
    }
    pub fn j2000_to_galactic(&self) -> &Matrix4<f64> {
        &MAT_J2000_TO_GALACTIC
    }
    pub fn galactic_to_j2000(&self) -> &Matrix4<f64> {
        &MAT_GALACTIC_TO_J2000
    }

    /// Every forward matrix paired with its inverse.
    pub fn pairs(&self) -> [(&Matrix4<f64>, &Matrix4<f64>); 8] {
        [
            (&self.alt_az_to_equ, &self.equ_to_alt_az),
            (&self.equ_to_j2000, &self.j2000_to_equ),
            (&self.alt_az_to_j2000, &self.j2000_to_alt_az),
            (&self.helio_to_equ, &self.equ_to_helio),
            (&self.alt_az_to_helio, &self.helio_to_alt_az),
            (&self.equ_to_galactic, &self.galactic_to_equ),
            (self.j2000_to_vsop87(), self.vsop87_to_j2000()),
            (self.j2000_to_galactic(), self.galactic_to_j2000()),
        ]
    }

    /// Observer position in the heliocentric ecliptic frame, in AU.
    pub fn observer_heliocentric_position(&self) -> Vector3<f64> {
        let m = &self.alt_az_to_helio;
        Vector3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)])
    }

    /// Matrix taking coordinates in `from` to coordinates in `to`.
    ///
    /// Pairs without a stored matrix are chained through the equatorial
    /// frame of date.
    pub fn matrix(&self, from: Frame, to: Frame) -> Matrix4<f64> {
        use Frame::*;
        match (from, to) {
            (a, b) if a == b => Matrix4::identity(),
            (AltAz, J2000) => self.alt_az_to_j2000,
            (J2000, AltAz) => self.j2000_to_alt_az,
            (AltAz, HeliocentricEcliptic) => self.alt_az_to_helio,
            (HeliocentricEcliptic, AltAz) => self.helio_to_alt_az,
            (J2000, Galactic) => *MAT_J2000_TO_GALACTIC,
            (Galactic, J2000) => *MAT_GALACTIC_TO_J2000,
            _ => self.equ_to(to) * self.to_equ(from),
        }
    }

    fn to_equ(&self, from: Frame) -> Matrix4<f64> {
        match from {
            Frame::AltAz => self.alt_az_to_equ,
            Frame::EquatorialOfDate => Matrix4::identity(),
            Frame::J2000 => self.j2000_to_equ,
            Frame::HeliocentricEcliptic => self.helio_to_equ,
            Frame::Galactic => self.galactic_to_equ,
        }
    }

    fn equ_to(&self, to: Frame) -> Matrix4<f64> {
        match to {
            Frame::AltAz => self.equ_to_alt_az,
            Frame::EquatorialOfDate => Matrix4::identity(),
            Frame::J2000 => self.equ_to_j2000,
            Frame::HeliocentricEcliptic => self.equ_to_helio,
            Frame::Galactic => self.equ_to_galactic,
        }
    }

    /// Rotate a direction; translations are ignored.
    pub fn convert_direction(&self, from: Frame, to: Frame, v: &Vector3<f64>) -> Vector3<f64> {
        self.matrix(from, to).transform_vector(v)
    }

    /// Map a point, honouring frame origins.
    pub fn convert_position(&self, from: Frame, to: Frame, p: &Vector3<f64>) -> Vector3<f64> {
        self.matrix(from, to).transform_point(&Point3::from(*p)).coords
    }
}
