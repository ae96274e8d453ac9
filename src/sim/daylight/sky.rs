use std::fmt;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

use super::weather::WeatherData;

/// What the recipe computes at each analysis point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SimulationKind {
    /// Illuminance in lux.
    #[default]
    Illuminance = 0,
    /// Irradiance / radiation in W/m^2.
    Radiation = 1,
    /// Luminance in cd/m^2.
    Luminance = 2,
}

impl SimulationKind {
    /// `gendaymtx` output spectrum flag: visible or solar.
    pub fn spectrum_flag(&self) -> &'static str {
        match self {
            SimulationKind::Radiation => "-O1",
            _ => "-O0",
        }
    }

    /// Short label used in sky matrix file names.
    pub fn spectrum_label(&self) -> &'static str {
        match self {
            SimulationKind::Radiation => "sol",
            _ => "vis",
        }
    }

    /// RGB weights used to reduce three-channel results to a single value.
    pub fn rgb_coefficients(&self) -> [f64; 3] {
        match self {
            SimulationKind::Radiation => [0.265, 0.670, 0.065],
            _ => [47.4, 119.9, 11.6],
        }
    }
}

impl TryFrom<u8> for SimulationKind {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(SimulationKind::Illuminance),
            1 => Ok(SimulationKind::Radiation),
            2 => Ok(SimulationKind::Luminance),
            _ => Err(Error::Configuration(format!(
                "simulation kind should be between 0-2, got {value}"
            ))),
        }
    }
}

impl fmt::Display for SimulationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SimulationKind::Illuminance => "illuminance",
            SimulationKind::Radiation => "radiation",
            SimulationKind::Luminance => "luminance",
        };
        write!(f, "{name}")
    }
}

/// Where the sky luminance data comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum SkySource {
    /// EnergyPlus weather file. Climate-based.
    Epw(PathBuf),
    /// Constant diffuse horizontal irradiance (W/m^2) with no direct component.
    Uniform { diffuse_horizontal: f64 },
}

/// Time extent of the sky.
#[derive(Debug, Clone, PartialEq)]
pub enum SkySpan {
    Instant { hoy: f64 },
    Matrix { hoys: Vec<f64> },
}

/// Sky used to drive a daylight-coefficient analysis.
///
/// This is the only owner of the simulation kind. Recipes read it through
/// the sky, so the two can never disagree.
#[derive(Debug, Clone, PartialEq)]
pub struct SkyDescriptor {
    name: String,
    density: u32,
    source: SkySource,
    span: SkySpan,
    simulation_kind: SimulationKind,
}

impl SkyDescriptor {
    /// Creates a sky, checking density and kind/climate compatibility.
    pub fn new(
        name: &str,
        density: u32,
        source: SkySource,
        span: SkySpan,
        simulation_kind: SimulationKind,
    ) -> Result<Self> {
        if density < 1 {
            return Err(Error::Configuration(format!(
                "sky density must be a positive integer, got {density}"
            )));
        }
        if let SkySpan::Matrix { hoys } = &span {
            if hoys.is_empty() {
                return Err(Error::Configuration(format!(
                    "sky matrix '{name}' has no time steps"
                )));
            }
        }
        let mut sky = Self {
            name: name.to_string(),
            density,
            source,
            span,
            simulation_kind: SimulationKind::default(),
        };
        sky.set_simulation_kind(simulation_kind)?;
        Ok(sky)
    }

    /// Climate-based sky matrix for every hour found in an EPW file.
    pub fn from_epw(path: &Path, density: u32) -> Result<Self> {
        let is_epw = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("epw"));
        if !is_epw {
            return Err(Error::InvalidInput(format!(
                "{} is not an EnergyPlus weather file",
                path.display()
            )));
        }
        let weather = WeatherData::read_epw(path)
            .map_err(|e| Error::InvalidInput(format!("{e:#}")))?;
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("sky")
            .replace(char::is_whitespace, "_");

        Self::new(
            &name,
            density,
            SkySource::Epw(path.to_path_buf()),
            SkySpan::Matrix {
                hoys: weather.hoys(),
            },
            SimulationKind::Illuminance,
        )
    }

    /// Non climate-based sky matrix with a constant diffuse sky.
    pub fn uniform(name: &str, diffuse_horizontal: f64, hoys: Vec<f64>, density: u32) -> Result<Self> {
        Self::new(
            name,
            density,
            SkySource::Uniform { diffuse_horizontal },
            SkySpan::Matrix { hoys },
            SimulationKind::Illuminance,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn density(&self) -> u32 {
        self.density
    }

    /// Radiance sky type label, e.g. `r1` (Tregenza) or `r2` (Reinhart).
    pub fn density_label(&self) -> String {
        format!("r{}", self.density)
    }

    pub fn source(&self) -> &SkySource {
        &self.source
    }

    pub fn is_climate_based(&self) -> bool {
        matches!(self.source, SkySource::Epw(_))
    }

    pub fn is_point_in_time(&self) -> bool {
        matches!(self.span, SkySpan::Instant { .. })
    }

    /// Hours of the year spanned by the sky.
    pub fn hoys(&self) -> Vec<f64> {
        match &self.span {
            SkySpan::Instant { hoy } => vec![*hoy],
            SkySpan::Matrix { hoys } => hoys.clone(),
        }
    }

    /// Short stable hash of the sky data and time steps.
    ///
    /// Part of the sky matrix file names, so a matrix on disk is only reused
    /// for the same weather data and period.
    pub fn fingerprint(&self) -> String {
        let mut hash = FNV_OFFSET;
        match &self.source {
            SkySource::Epw(path) => hash = fnv1a(hash, path.to_string_lossy().as_bytes()),
            SkySource::Uniform { diffuse_horizontal } => {
                hash = fnv1a(hash, &diffuse_horizontal.to_le_bytes())
            }
        }
        for hoy in self.hoys() {
            hash = fnv1a(hash, &hoy.to_le_bytes());
        }
        format!("{:08x}", (hash >> 32) as u32 ^ hash as u32)
    }

    pub fn simulation_kind(&self) -> SimulationKind {
        self.simulation_kind
    }

    /// Radiation needs measured weather; other kinds work with any sky.
    pub fn set_simulation_kind(&mut self, kind: SimulationKind) -> Result<()> {
        if kind == SimulationKind::Radiation && !self.is_climate_based() {
            return Err(Error::Configuration(format!(
                "sky '{}' for radiation analysis should be climate-based",
                self.name
            )));
        }
        self.simulation_kind = kind;
        Ok(())
    }
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(mut hash: u64, bytes: &[u8]) -> u64 {
    for b in bytes {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
