use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LineError;
use crate::units::Wavelength;

/// Wavelength tolerance (Å) for an exact rest-wavelength lookup.
pub const WREST_TOLERANCE: f64 = 1e-4;

// ---------------------------------------------------------------------------
// Transition – immutable atomic data for one line
// ---------------------------------------------------------------------------

/// Atomic data for one transition, validated at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TransitionRecord", into = "TransitionRecord")]
pub struct Transition {
    name: String,
    wrest: Wavelength,
    f: f64,
    gamma: f64,
    atomic_number: u8,
    ion: u8,
}

impl Transition {
    pub fn new(
        name: impl Into<String>,
        wrest: Wavelength,
        f: f64,
        gamma: f64,
        atomic_number: u8,
        ion: u8,
    ) -> Result<Self, LineError> {
        let name = name.into();
        if !(wrest.angstrom().is_finite() && wrest.angstrom() > 0.0) {
            return Err(LineError::InvalidTransition(format!(
                "{name}: rest wavelength must be positive, got {}",
                wrest.angstrom()
            )));
        }
        if !(f.is_finite() && f >= 0.0) {
            return Err(LineError::InvalidTransition(format!(
                "{name}: oscillator strength must be >= 0, got {f}"
            )));
        }
        if !(gamma.is_finite() && gamma >= 0.0) {
            return Err(LineError::InvalidTransition(format!(
                "{name}: damping constant must be >= 0, got {gamma}"
            )));
        }
        Ok(Self {
            name,
            wrest,
            f,
            gamma,
            atomic_number,
            ion,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn wrest(&self) -> Wavelength {
        self.wrest
    }

    /// Oscillator strength.
    pub fn f(&self) -> f64 {
        self.f
    }

    /// Damping constant (s⁻¹).
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn atomic_number(&self) -> u8 {
        self.atomic_number
    }

    pub fn ion(&self) -> u8 {
        self.ion
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Transition: {}, wrest={:.4}, f={}]",
            self.name,
            self.wrest.angstrom(),
            self.f
        )
    }
}

/// On-disk layout of a transition (JSON object or CSV row).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub name: String,
    pub wrest: f64,
    pub f: f64,
    #[serde(default)]
    pub gamma: f64,
    #[serde(rename = "Z", alias = "z", default)]
    pub atomic_number: u8,
    #[serde(default)]
    pub ion: u8,
}

impl TryFrom<TransitionRecord> for Transition {
    type Error = LineError;

    fn try_from(r: TransitionRecord) -> Result<Self, Self::Error> {
        Transition::new(
            r.name,
            Wavelength::from_angstrom(r.wrest),
            r.f,
            r.gamma,
            r.atomic_number,
            r.ion,
        )
    }
}

impl From<Transition> for TransitionRecord {
    fn from(t: Transition) -> Self {
        TransitionRecord {
            name: t.name,
            wrest: t.wrest.angstrom(),
            f: t.f,
            gamma: t.gamma,
            atomic_number: t.atomic_number,
            ion: t.ion,
        }
    }
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// How a transition is requested from a line list.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionKey {
    /// Transition name, e.g. `"CIV 1548"`.
    Name(String),
    /// Rest wavelength; with `closest` the nearest line is taken instead of
    /// requiring a match within [`WREST_TOLERANCE`].
    Wavelength { wrest: Wavelength, closest: bool },
}

impl From<&str> for TransitionKey {
    fn from(name: &str) -> Self {
        TransitionKey::Name(name.to_string())
    }
}

impl From<Wavelength> for TransitionKey {
    fn from(wrest: Wavelength) -> Self {
        TransitionKey::Wavelength {
            wrest,
            closest: false,
        }
    }
}

impl fmt::Display for TransitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionKey::Name(name) => write!(f, "{name}"),
            TransitionKey::Wavelength { wrest, .. } => write!(f, "{wrest}"),
        }
    }
}

/// Source of atomic data, passed into line construction.
pub trait TransitionLookup {
    fn lookup(&self, key: &TransitionKey) -> Result<Transition, LineError>;
}

// ---------------------------------------------------------------------------
// LineList – in-memory table
// ---------------------------------------------------------------------------

/// An in-memory table of transitions ordered by rest wavelength.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineList {
    lines: Vec<Transition>,
    by_name: BTreeMap<String, usize>,
}

impl LineList {
    pub fn new(mut lines: Vec<Transition>) -> Self {
        lines.sort_by(|a, b| a.wrest.angstrom().total_cmp(&b.wrest.angstrom()));
        let by_name = lines
            .iter()
            .enumerate()
            .map(|(i, t)| (normalize_name(&t.name), i))
            .collect();
        Self { lines, by_name }
    }

    /// Common ISM / IGM resonance lines.
    pub fn ism() -> Self {
        // (name, wrest Å, f, gamma s^-1, Z, ion)
        const ISM: &[(&str, f64, f64, f64, u8, u8)] = &[
            ("HI 1025", 1025.7223, 0.07912, 1.897e8, 1, 1),
            ("OVI 1031", 1031.9261, 0.1325, 4.163e8, 8, 6),
            ("OVI 1037", 1037.6167, 0.0658, 4.09e8, 8, 6),
            ("HI 1215", 1215.6701, 0.4164, 6.265e8, 1, 1),
            ("SiII 1260", 1260.4221, 1.18, 2.95e9, 14, 2),
            ("CII 1334", 1334.5323, 0.1278, 2.88e8, 6, 2),
            ("SiIV 1393", 1393.7602, 0.513, 8.8e8, 14, 4),
            ("SiIV 1402", 1402.7729, 0.254, 8.63e8, 14, 4),
            ("CIV 1548", 1548.195, 0.1899, 2.642e8, 6, 4),
            ("CIV 1550", 1550.770, 0.09475, 2.628e8, 6, 4),
            ("AlII 1670", 1670.7886, 1.74, 1.39e9, 13, 2),
            ("FeII 2382", 2382.7652, 0.32, 3.13e8, 26, 2),
            ("MgII 2796", 2796.354, 0.6155, 2.625e8, 12, 2),
            ("MgII 2803", 2803.531, 0.3058, 2.595e8, 12, 2),
        ];
        let lines = ISM
            .iter()
            .filter_map(|&(name, wrest, f, gamma, z, ion)| {
                Transition::new(name, Wavelength::from_angstrom(wrest), f, gamma, z, ion).ok()
            })
            .collect();
        Self::new(lines)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.lines.iter()
    }

    /// Names in wavelength order, for pickers.
    pub fn names(&self) -> Vec<String> {
        self.lines.iter().map(|t| t.name.clone()).collect()
    }

    fn closest(&self, wrest: Wavelength) -> Option<&Transition> {
        self.lines.iter().min_by(|a, b| {
            let da = (a.wrest.angstrom() - wrest.angstrom()).abs();
            let db = (b.wrest.angstrom() - wrest.angstrom()).abs();
            da.total_cmp(&db)
        })
    }
}

impl TransitionLookup for LineList {
    fn lookup(&self, key: &TransitionKey) -> Result<Transition, LineError> {
        let found = match key {
            TransitionKey::Name(name) => self
                .by_name
                .get(&normalize_name(name))
                .map(|&i| &self.lines[i]),
            TransitionKey::Wavelength { wrest, closest } => {
                self.closest(*wrest).filter(|t| {
                    *closest || (t.wrest.angstrom() - wrest.angstrom()).abs() < WREST_TOLERANCE
                })
            }
        };
        found
            .cloned()
            .ok_or_else(|| LineError::UnknownTransition(key.to_string()))
    }
}

/// Case- and whitespace-insensitive key, so `"CIV 1548"` == `"civ1548"`.
fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
