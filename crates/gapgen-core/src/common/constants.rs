//! PDG species codes and rest masses shared across the generation and
//! validation modules.
//!
//! Codes are the signed PDG Monte Carlo numbering scheme; masses are PDG
//! world averages in GeV. Only the species used by the production
//! configurations are tabulated; [`rest_mass`] returns `None` for anything
//! else so callers must handle unknown species explicitly.

use particle_id::ParticleID;

pub const ELECTRON: i32 = 11;
pub const MUON: i32 = 13;
pub const PHOTON: i32 = 22;
pub const PI_ZERO: i32 = 111;
pub const RHO_ZERO: i32 = 113;
pub const K_ZERO_LONG: i32 = 130;
pub const PI_PLUS: i32 = 211;
pub const ETA: i32 = 221;
pub const OMEGA_MESON: i32 = 223;
pub const K_ZERO_SHORT: i32 = 310;
pub const K_ZERO: i32 = 311;
pub const K_PLUS: i32 = 321;
pub const ETA_PRIME: i32 = 331;
pub const PHI: i32 = 333;
pub const D_PLUS: i32 = 411;
pub const D_ZERO: i32 = 421;
pub const D_S_PLUS: i32 = 431;
pub const JPSI: i32 = 443;
pub const NEUTRON: i32 = 2112;
pub const PROTON: i32 = 2212;
pub const SIGMA_MINUS: i32 = 3112;
pub const LAMBDA: i32 = 3122;
pub const SIGMA_PLUS: i32 = 3222;
pub const XI_MINUS: i32 = 3312;
pub const OMEGA_MINUS: i32 = 3334;
pub const LAMBDA_C_PLUS: i32 = 4122;
pub const XI_C_ZERO: i32 = 4132;

/// Species that are their own antiparticle; sign conjugation leaves these
/// codes untouched when matching decay daughter multisets.
pub const SELF_CONJUGATE: [i32; 10] = [
    PHOTON,
    PI_ZERO,
    RHO_ZERO,
    K_ZERO_LONG,
    ETA,
    OMEGA_MESON,
    K_ZERO_SHORT,
    ETA_PRIME,
    PHI,
    JPSI,
];

pub fn is_self_conjugate(code: i32) -> bool {
    SELF_CONJUGATE.contains(&code.abs())
}

/// Charged species that survive to the final state in the generators this
/// crate wraps. Used by the leading-charged-particle selection.
pub const CHARGED_FINAL_STATE: [i32; 9] = [
    ELECTRON,
    MUON,
    PI_PLUS,
    K_PLUS,
    PROTON,
    SIGMA_MINUS,
    SIGMA_PLUS,
    XI_MINUS,
    OMEGA_MINUS,
];

pub fn is_charged_final_state(code: i32) -> bool {
    CHARGED_FINAL_STATE.contains(&code.abs())
}

/// Rest mass lookup by species code, sign-insensitive.
pub fn rest_mass(id: ParticleID) -> Option<f64> {
    let mass = match id.id().abs() {
        ELECTRON => 0.000_510_999,
        MUON => 0.105_658_4,
        PHOTON => 0.0,
        PI_ZERO => 0.134_976_6,
        RHO_ZERO => 0.775_26,
        K_ZERO_LONG | K_ZERO_SHORT | K_ZERO => 0.497_611,
        PI_PLUS => 0.139_570_4,
        ETA => 0.547_862,
        OMEGA_MESON => 0.782_66,
        K_PLUS => 0.493_677,
        ETA_PRIME => 0.957_78,
        PHI => 1.019_461,
        D_PLUS => 1.869_66,
        D_ZERO => 1.864_84,
        D_S_PLUS => 1.968_35,
        JPSI => 3.096_900,
        NEUTRON => 0.939_565_4,
        PROTON => 0.938_272_1,
        SIGMA_MINUS => 1.197_449,
        LAMBDA => 1.115_683,
        SIGMA_PLUS => 1.189_37,
        XI_MINUS => 1.321_71,
        OMEGA_MINUS => 1.672_45,
        LAMBDA_C_PLUS => 2.286_46,
        XI_C_ZERO => 2.470_44,
        _ => return None,
    };
    Some(mass)
}

#[cfg(test)]
mod tests {
    use super::{is_charged_final_state, is_self_conjugate, rest_mass, PI_PLUS, PHI, XI_C_ZERO};
    use particle_id::ParticleID;

    #[test]
    fn mass_lookup_is_sign_insensitive() {
        let pi_plus = rest_mass(ParticleID::new(PI_PLUS)).unwrap();
        let pi_minus = rest_mass(ParticleID::new(-PI_PLUS)).unwrap();
        assert_eq!(pi_plus, pi_minus);
        assert!((pi_plus - 0.139_570_4).abs() < 1.0e-9);

        assert!(rest_mass(ParticleID::new(XI_C_ZERO)).is_some());
        assert!(rest_mass(ParticleID::new(999_999)).is_none());
    }

    #[test]
    fn conjugation_and_charge_tables_cover_the_obvious_cases() {
        assert!(is_self_conjugate(PHI));
        assert!(is_self_conjugate(-PHI));
        assert!(!is_self_conjugate(PI_PLUS));

        assert!(is_charged_final_state(-PI_PLUS));
        assert!(!is_charged_final_state(22));
    }
}
