//! Cell state, regulatory-network types, and the spatial mode.

use std::fmt;

/// Spatial dimensionality of a simulation.
///
/// In 2D mode the z axis is degenerate: the domain has `size.z = 0` and
/// every location keeps `z = 0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Two-dimensional domain (z pinned to 0).
    TwoD,
    /// Three-dimensional domain.
    ThreeD,
}

impl Mode {
    /// Number of live spatial dimensions (2 or 3).
    pub fn dimensions(self) -> usize {
        match self {
            Mode::TwoD => 2,
            Mode::ThreeD => 3,
        }
    }
}

/// The two mutually exclusive cell types.
///
/// Transitions are one-way: `Pluripotent` → `Differentiated`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellState {
    /// Undifferentiated stem cell.
    Pluripotent,
    /// Terminally differentiated cell.
    Differentiated,
}

impl fmt::Display for CellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pluripotent => write!(f, "Pluripotent"),
            Self::Differentiated => write!(f, "Differentiated"),
        }
    }
}

/// Value space of the finite dynamical system: `Z/kZ` with `k` in {2, 3}.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateSpace {
    /// Boolean network, `k = 2`.
    Boolean,
    /// Ternary network, `k = 3`.
    Ternary,
}

impl StateSpace {
    /// The modulus `k`.
    pub fn modulus(self) -> u8 {
        match self {
            Self::Boolean => 2,
            Self::Ternary => 3,
        }
    }

    /// The high level `k - 1`.
    pub fn high(self) -> u8 {
        self.modulus() - 1
    }

    /// Quantize a concentration into `{0, …, k−1}` using `k−1` thresholds
    /// at `c_max · i / k`.
    pub fn quantize(self, value: f64, c_max: f64) -> u8 {
        match self {
            Self::Boolean => {
                if value > c_max * 0.5 {
                    1
                } else {
                    0
                }
            }
            Self::Ternary => {
                if value > c_max * 2.0 / 3.0 {
                    2
                } else if value > c_max / 3.0 {
                    1
                } else {
                    0
                }
            }
        }
    }

    /// Parse from the configured modulus.
    pub fn from_modulus(k: u8) -> Option<Self> {
        match k {
            2 => Some(Self::Boolean),
            3 => Some(Self::Ternary),
            _ => None,
        }
    }
}

/// Discrete regulatory state of one cell: (FGFR, ERK, GATA6, NANOG),
/// each in `Z/kZ`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Fds {
    /// FGF receptor level.
    pub fgfr: u8,
    /// ERK kinase level.
    pub erk: u8,
    /// GATA6 transcription factor level.
    pub gata6: u8,
    /// NANOG transcription factor level.
    pub nanog: u8,
}

impl Fds {
    /// Advance the network one update given the quantized extracellular
    /// FGF4 level.
    ///
    /// The closed-form polynomial maps are part of the model's external
    /// contract and are reproduced exactly: with `x1 = fgf4`, `x2 = FGFR`,
    /// `x3 = ERK`, `x4 = GATA6`, `x5 = NANOG`,
    ///
    /// Boolean (`k = 2`):
    /// ```text
    /// FGFR'  = x1·x4                  mod 2
    /// ERK'   = x2                     mod 2
    /// GATA6' = 1 + x5 + x5·x4         mod 2
    /// NANOG' = (x3 + 1)·(x4 + 1)      mod 2
    /// ```
    ///
    /// Ternary (`k = 3`):
    /// ```text
    /// FGFR'  = x1·x4·((2x1+1)(2x4+1) + x1·x4)                   mod 3
    /// ERK'   = x2                                               mod 3
    /// GATA6' = x4²(x5+1) + x5²(x4+1) + 2x5 + 1                  mod 3
    /// NANOG' = x5² + x5(x5+1)·(x3(2x4²+2x3+1) + x4(2x3²+2x4+1))
    ///        + (2x3²+1)(2x4²+1)                                 mod 3
    /// ```
    pub fn advance(self, fgf4: u8, space: StateSpace) -> Fds {
        let x1 = u32::from(fgf4);
        let x2 = u32::from(self.fgfr);
        let x3 = u32::from(self.erk);
        let x4 = u32::from(self.gata6);
        let x5 = u32::from(self.nanog);

        match space {
            StateSpace::Boolean => Fds {
                fgfr: ((x1 * x4) % 2) as u8,
                erk: (x2 % 2) as u8,
                gata6: ((1 + x5 + x5 * x4) % 2) as u8,
                nanog: (((x3 + 1) * (x4 + 1)) % 2) as u8,
            },
            StateSpace::Ternary => Fds {
                fgfr: ((x1 * x4 * ((2 * x1 + 1) * (2 * x4 + 1) + x1 * x4)) % 3) as u8,
                erk: (x2 % 3) as u8,
                gata6: ((x4 * x4 * (x5 + 1) + x5 * x5 * (x4 + 1) + 2 * x5 + 1) % 3) as u8,
                nanog: ((x5 * x5
                    + x5 * (x5 + 1)
                        * (x3 * (2 * x4 * x4 + 2 * x3 + 1) + x4 * (2 * x3 * x3 + 2 * x4 + 1))
                    + (2 * x3 * x3 + 1) * (2 * x4 * x4 + 1))
                    % 3) as u8,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_quantize_threshold_at_half_max() {
        let s = StateSpace::Boolean;
        assert_eq!(s.quantize(0.0, 10.0), 0);
        assert_eq!(s.quantize(5.0, 10.0), 0);
        assert_eq!(s.quantize(5.1, 10.0), 1);
    }

    #[test]
    fn ternary_quantize_thresholds_at_thirds() {
        let s = StateSpace::Ternary;
        assert_eq!(s.quantize(3.0, 9.0), 0);
        assert_eq!(s.quantize(3.1, 9.0), 1);
        assert_eq!(s.quantize(6.0, 9.0), 1);
        assert_eq!(s.quantize(6.1, 9.0), 2);
    }

    #[test]
    fn modulus_parse_rejects_other_values() {
        assert_eq!(StateSpace::from_modulus(2), Some(StateSpace::Boolean));
        assert_eq!(StateSpace::from_modulus(3), Some(StateSpace::Ternary));
        assert_eq!(StateSpace::from_modulus(4), None);
    }

    #[test]
    fn boolean_rules_spot_checks() {
        // NANOG-high pluripotent rest state with no FGF4: NANOG stays on
        // only while ERK and GATA6 are both low.
        let rest = Fds {
            fgfr: 0,
            erk: 0,
            gata6: 0,
            nanog: 1,
        };
        let next = rest.advance(0, StateSpace::Boolean);
        assert_eq!(
            next,
            Fds {
                fgfr: 0,
                erk: 0,
                gata6: 0,
                nanog: 1
            }
        );

        // GATA6 high with NANOG low holds GATA6 high (1 + 0 + 0 = 1).
        let gata = Fds {
            fgfr: 0,
            erk: 0,
            gata6: 1,
            nanog: 0,
        };
        let next = gata.advance(0, StateSpace::Boolean);
        assert_eq!(next.gata6, 1);
        assert_eq!(next.nanog, 0);

        // FGFR' requires both FGF4 and GATA6.
        assert_eq!(gata.advance(1, StateSpace::Boolean).fgfr, 1);
        assert_eq!(rest.advance(1, StateSpace::Boolean).fgfr, 0);
    }

    #[test]
    fn boolean_erk_follows_fgfr() {
        let f = Fds {
            fgfr: 1,
            erk: 0,
            gata6: 0,
            nanog: 0,
        };
        assert_eq!(f.advance(0, StateSpace::Boolean).erk, 1);
    }

    #[test]
    fn ternary_rules_spot_checks() {
        // All-zero state: GATA6' = 1, NANOG' = (1)(1) = 1, rest zero.
        let zero = Fds::default();
        let next = zero.advance(0, StateSpace::Ternary);
        assert_eq!(next.fgfr, 0);
        assert_eq!(next.erk, 0);
        assert_eq!(next.gata6, 1);
        assert_eq!(next.nanog, 1);

        // FGFR': x1=2, x4=2 -> 2*2*((5)(5) + 4) = 4*29 = 116 ≡ 2 (mod 3).
        let g2 = Fds {
            fgfr: 0,
            erk: 0,
            gata6: 2,
            nanog: 0,
        };
        assert_eq!(g2.advance(2, StateSpace::Ternary).fgfr, 2);

        // GATA6': x4=2, x5=0 -> 4*1 + 0 + 0 + 1 = 5 ≡ 2 (mod 3).
        assert_eq!(g2.advance(0, StateSpace::Ternary).gata6, 2);

        // NANOG with x5=2, x3=0, x4=0: 4 + 2*3*0 + 1*1 = 5 ≡ 2 (mod 3).
        let n2 = Fds {
            fgfr: 0,
            erk: 0,
            gata6: 0,
            nanog: 2,
        };
        assert_eq!(n2.advance(0, StateSpace::Ternary).nanog, 2);
    }

    #[test]
    fn advance_stays_in_value_space() {
        for space in [StateSpace::Boolean, StateSpace::Ternary] {
            let k = space.modulus();
            for x1 in 0..k {
                for x2 in 0..k {
                    for x3 in 0..k {
                        for x4 in 0..k {
                            for x5 in 0..k {
                                let f = Fds {
                                    fgfr: x2,
                                    erk: x3,
                                    gata6: x4,
                                    nanog: x5,
                                };
                                let next = f.advance(x1, space);
                                assert!(next.fgfr < k);
                                assert!(next.erk < k);
                                assert!(next.gata6 < k);
                                assert!(next.nanog < k);
                            }
                        }
                    }
                }
            }
        }
    }
}
