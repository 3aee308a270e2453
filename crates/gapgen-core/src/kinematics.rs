//! Four-momentum construction and accessors.
//!
//! Momenta are stored as `[px, py, pz, e]` in GeV. Builders take the
//! transverse-momentum parametrisation used by the generator configurations:
//! (pt, eta, phi) or (pt, y, phi) plus the rest mass.

/// Build `[px, py, pz, e]` from transverse momentum, pseudorapidity and
/// azimuth.
pub fn four_momentum_from_pt_eta_phi(pt: f64, eta: f64, phi: f64, mass: f64) -> [f64; 4] {
    let px = pt * phi.cos();
    let py = pt * phi.sin();
    let pz = pt * eta.sinh();
    let e = (px * px + py * py + pz * pz + mass * mass).sqrt();
    [px, py, pz, e]
}

/// Build `[px, py, pz, e]` from transverse momentum, rapidity and azimuth.
pub fn four_momentum_from_pt_y_phi(pt: f64, y: f64, phi: f64, mass: f64) -> [f64; 4] {
    let mt = (pt * pt + mass * mass).sqrt();
    let px = pt * phi.cos();
    let py = pt * phi.sin();
    let pz = mt * y.sinh();
    let e = mt * y.cosh();
    [px, py, pz, e]
}

pub fn pt(p: &[f64; 4]) -> f64 {
    (p[0] * p[0] + p[1] * p[1]).sqrt()
}

pub fn phi(p: &[f64; 4]) -> f64 {
    p[1].atan2(p[0])
}

pub fn momentum_magnitude(p: &[f64; 4]) -> f64 {
    (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt()
}

/// Pseudorapidity; saturates to +-infinity-safe large values on the beam
/// axis where |p| == |pz|.
pub fn pseudorapidity(p: &[f64; 4]) -> f64 {
    let mag = momentum_magnitude(p);
    let denom = mag - p[2].abs();
    if denom <= 0.0 {
        return if p[2] >= 0.0 { f64::MAX } else { -f64::MAX };
    }
    0.5 * ((mag + p[2].abs()) / denom).ln() * p[2].signum()
}

/// Rapidity; saturates like [`pseudorapidity`] when e == |pz| (massless
/// particle along the beam axis).
pub fn rapidity(p: &[f64; 4]) -> f64 {
    let denom = p[3] - p[2];
    if denom <= 0.0 {
        return f64::MAX;
    }
    let num = p[3] + p[2];
    if num <= 0.0 {
        return -f64::MAX;
    }
    0.5 * (num / denom).ln()
}

pub fn invariant_mass(p: &[f64; 4]) -> f64 {
    let m2 = p[3] * p[3] - (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]);
    m2.max(0.0).sqrt()
}

/// Boost `p` by the velocity of the frame moving with four-momentum `frame`.
///
/// Used to take two-body decay daughters from the mother rest frame to the
/// lab frame.
pub fn boost(p: &[f64; 4], frame: &[f64; 4]) -> [f64; 4] {
    let m = invariant_mass(frame);
    if m <= 0.0 {
        return *p;
    }
    let gamma = frame[3] / m;
    let bx = frame[0] / frame[3];
    let by = frame[1] / frame[3];
    let bz = frame[2] / frame[3];
    let b2 = bx * bx + by * by + bz * bz;
    if b2 <= 0.0 {
        return *p;
    }
    let bp = bx * p[0] + by * p[1] + bz * p[2];
    let coeff = (gamma - 1.0) * bp / b2 + gamma * p[3];
    [
        p[0] + coeff * bx,
        p[1] + coeff * by,
        p[2] + coeff * bz,
        gamma * (p[3] + bp),
    ]
}
