use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Ideal gas constant, J/(mol·K). With volume in litres pressure comes out in kPa.
pub const GAS_CONSTANT: f64 = 8.314;
pub const DEFAULT_TEMPERATURE: f64 = 293.0;
pub const DEFAULT_VOLUME: f64 = 100.0;
/// Standard sea-level pressure in kPa.
pub const ONE_ATMOSPHERE: f64 = 101.325;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GasType {
    Oxygen,
    Nitrogen,
    CarbonDioxide,
    Plasma,
    WaterVapor,
    Methane,
    Hydrogen,
    Helium,
    Argon,
    Tritium,
}

impl GasType {
    pub const ALL: [GasType; 10] = [
        GasType::Oxygen,
        GasType::Nitrogen,
        GasType::CarbonDioxide,
        GasType::Plasma,
        GasType::WaterVapor,
        GasType::Methane,
        GasType::Hydrogen,
        GasType::Helium,
        GasType::Argon,
        GasType::Tritium,
    ];

    /// Gases consumed by fire, in burn order.
    pub const FLAMMABLE: [GasType; 3] = [GasType::Plasma, GasType::Methane, GasType::Hydrogen];

    pub const fn key(self) -> &'static str {
        match self {
            Self::Oxygen => "oxygen",
            Self::Nitrogen => "nitrogen",
            Self::CarbonDioxide => "carbon_dioxide",
            Self::Plasma => "plasma",
            Self::WaterVapor => "water_vapor",
            Self::Methane => "methane",
            Self::Hydrogen => "hydrogen",
            Self::Helium => "helium",
            Self::Argon => "argon",
            Self::Tritium => "tritium",
        }
    }

    /// Human-readable name.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Oxygen => "Oxygen",
            Self::Nitrogen => "Nitrogen",
            Self::CarbonDioxide => "Carbon Dioxide",
            Self::Plasma => "Plasma",
            Self::WaterVapor => "Water Vapor",
            Self::Methane => "Methane",
            Self::Hydrogen => "Hydrogen",
            Self::Helium => "Helium",
            Self::Argon => "Argon",
            Self::Tritium => "Tritium",
        }
    }

    pub fn is_flammable(self) -> bool {
        Self::FLAMMABLE.contains(&self)
    }
}

impl fmt::Display for GasType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown gas type: {0:?}")]
pub struct ParseGasError(pub String);

impl FromStr for GasType {
    type Err = ParseGasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|g| g.key().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| ParseGasError(s.to_owned()))
    }
}

/// A bag of gas quantities at one temperature in a fixed volume.
///
/// Pressure is derived from the ideal gas law and recomputed after every
/// mutation. It is `0` when the mixture is empty or has no volume.
#[derive(Debug, Clone, PartialEq)]
pub struct GasMixture {
    gases: BTreeMap<GasType, f64>,
    temperature: f64,
    volume: f64,
    pressure: f64,
}

impl Default for GasMixture {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPERATURE, DEFAULT_VOLUME)
    }
}

impl GasMixture {
    pub fn new(temperature: f64, volume: f64) -> Self {
        Self {
            gases: BTreeMap::new(),
            temperature: temperature.max(0.0),
            volume: volume.max(0.0),
            pressure: 0.0,
        }
    }

    /// Oxygen/nitrogen at one atmosphere and the default temperature.
    pub fn standard_air() -> Self {
        let mut air = Self::default();
        let total = ONE_ATMOSPHERE * air.volume / (GAS_CONSTANT * air.temperature);
        air.add(GasType::Oxygen, total * 0.21);
        air.add(GasType::Nitrogen, total * 0.79);
        air
    }

    pub fn moles(&self, gas: GasType) -> f64 {
        self.gases.get(&gas).copied().unwrap_or(0.0)
    }

    /// Gases with a non-zero amount.
    pub fn gases(&self) -> impl Iterator<Item = (GasType, f64)> + '_ {
        self.gases.iter().map(|(g, n)| (*g, *n))
    }

    pub fn add(&mut self, gas: GasType, amount: f64) {
        let next = (self.moles(gas) + amount).max(0.0);
        self.store(gas, next);
        self.recompute();
    }

    /// Remove up to `amount` of `gas`. Returns what was actually removed.
    pub fn remove(&mut self, gas: GasType, amount: f64) -> f64 {
        let present = self.moles(gas);
        let removed = amount.clamp(0.0, present);
        self.store(gas, present - removed);
        self.recompute();
        removed
    }

    pub fn set(&mut self, gas: GasType, amount: f64) {
        self.store(gas, amount.max(0.0));
        self.recompute();
    }

    fn store(&mut self, gas: GasType, amount: f64) {
        if amount > 0.0 {
            self.gases.insert(gas, amount);
        } else {
            self.gases.remove(&gas);
        }
    }

    pub fn total_moles(&self) -> f64 {
        self.gases.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.gases.is_empty()
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn set_temperature(&mut self, temperature: f64) {
        self.temperature = temperature.max(0.0);
        self.recompute();
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn pressure(&self) -> f64 {
        self.pressure
    }

    fn recompute(&mut self) {
        let total = self.total_moles();
        self.pressure = if total > 0.0 && self.volume > 0.0 {
            total * GAS_CONSTANT * self.temperature / self.volume
        } else {
            0.0
        };
    }

    pub fn fraction(&self, gas: GasType) -> f64 {
        let total = self.total_moles();
        if total > 0.0 {
            self.moles(gas) / total
        } else {
            0.0
        }
    }

    pub fn partial_pressure(&self, gas: GasType) -> f64 {
        self.fraction(gas) * self.pressure
    }

    pub fn has_gas(&self, gas: GasType) -> bool {
        self.moles(gas) > 0.0
    }

    pub fn breathable(&self) -> bool {
        self.fraction(GasType::Oxygen) > 0.16
    }

    pub fn toxic(&self) -> bool {
        self.fraction(GasType::CarbonDioxide) > 0.05 || self.has_gas(GasType::Plasma)
    }

    pub fn flammable(&self) -> bool {
        GasType::FLAMMABLE.iter().any(|g| self.has_gas(*g))
    }

    /// Add all of `other`'s gas into `self` and average the two temperatures.
    ///
    /// The average is unweighted, so heat is not conserved. `other` is left
    /// untouched.
    pub fn merge(&mut self, other: &GasMixture) {
        for (gas, amount) in other.gases() {
            let next = self.moles(gas) + amount;
            self.store(gas, next);
        }
        self.temperature = (self.temperature + other.temperature) / 2.0;
        self.recompute();
    }

    /// Partially equalize temperature and pressure with `other`.
    ///
    /// Temperatures move toward each other by `rate` of their gap. Gas then
    /// flows from the higher-pressure side: the moles needed to level the
    /// pressures (scaled by `rate`) leave the source in proportion to its
    /// composition. Total moles across both mixtures are conserved.
    pub fn equalize(&mut self, other: &mut GasMixture, rate: f64) {
        if self.is_empty() && other.is_empty() {
            return;
        }
        let rate = rate.clamp(0.0, 1.0);

        let gap = other.temperature - self.temperature;
        self.set_temperature(self.temperature + gap * rate);
        other.set_temperature(other.temperature - gap * rate);

        let dp = other.pressure - self.pressure;
        if dp > 0.0 {
            other.transfer_to(self, dp, rate);
        } else if dp < 0.0 {
            self.transfer_to(other, -dp, rate);
        }
    }

    fn transfer_to(&mut self, dest: &mut GasMixture, dp: f64, rate: f64) {
        let total = self.total_moles();
        if total <= 0.0 || self.temperature <= 0.0 {
            return;
        }
        let moles = (dp * self.volume / (2.0 * GAS_CONSTANT * self.temperature) * rate).min(total);
        let ratio = moles / total;
        let shares: Vec<(GasType, f64)> = self.gases().map(|(g, n)| (g, n * ratio)).collect();
        for (gas, share) in shares {
            let moved = self.remove(gas, share);
            dest.add(gas, moved);
        }
    }

    pub fn snapshot(&self) -> GasMixtureSnapshot {
        GasMixtureSnapshot {
            gases: self.gases.clone(),
            temperature: self.temperature,
            volume: self.volume,
            pressure: self.pressure,
        }
    }

    /// Rebuild from a snapshot. The stored pressure is ignored and derived
    /// again from the other fields.
    pub fn from_snapshot(snapshot: &GasMixtureSnapshot) -> Self {
        let mut mixture = Self::new(snapshot.temperature, snapshot.volume);
        for (gas, amount) in &snapshot.gases {
            mixture.store(*gas, amount.max(0.0));
        }
        mixture.recompute();
        mixture
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasMixtureSnapshot {
    pub gases: BTreeMap<GasType, f64>,
    pub temperature: f64,
    pub volume: f64,
    pub pressure: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn o2_n2(o2: f64, n2: f64) -> GasMixture {
        let mut m = GasMixture::default();
        m.add(GasType::Oxygen, o2);
        m.add(GasType::Nitrogen, n2);
        m
    }

    #[test]
    fn add_then_remove_restores_total() {
        let mut m = o2_n2(5.0, 20.0);
        let before = m.total_moles();
        m.add(GasType::Oxygen, 10.0);
        assert_eq!(m.remove(GasType::Oxygen, 10.0), 10.0);
        assert!((m.total_moles() - before).abs() < 1e-9);
    }

    #[test]
    fn remove_clamps_to_present() {
        let mut m = GasMixture::default();
        m.add(GasType::Oxygen, 10.0);
        assert_eq!(m.remove(GasType::Oxygen, 999.0), 10.0);
        assert_eq!(m.moles(GasType::Oxygen), 0.0);
        assert_eq!(m.remove(GasType::Oxygen, 1.0), 0.0);
        assert_eq!(m.remove(GasType::Nitrogen, -5.0), 0.0);
        assert!(m.is_empty());
    }

    #[test]
    fn pressure_follows_ideal_gas_law() {
        let m = o2_n2(10.0, 38.0);
        let expected = 48.0 * 8.314 * 293.0 / 100.0;
        assert!((m.pressure() - expected).abs() < 0.1);
        assert!((m.pressure() - 1169.28).abs() < 0.1);
    }

    #[test]
    fn pressure_tracks_every_mutation() {
        let mut m = o2_n2(10.0, 0.0);
        let p = m.pressure();
        m.set_temperature(586.0);
        assert!((m.pressure() - 2.0 * p).abs() < 1e-9);
        m.remove(GasType::Oxygen, 10.0);
        assert_eq!(m.pressure(), 0.0);

        let mut vacuum = GasMixture::new(293.0, 0.0);
        vacuum.add(GasType::Oxygen, 5.0);
        assert_eq!(vacuum.pressure(), 0.0);
    }

    #[test]
    fn fractions_and_partial_pressure() {
        let m = o2_n2(21.0, 79.0);
        assert!((m.fraction(GasType::Oxygen) - 0.21).abs() < 1e-12);
        assert!((m.partial_pressure(GasType::Oxygen) - 0.21 * m.pressure()).abs() < 1e-9);
        assert_eq!(GasMixture::default().fraction(GasType::Oxygen), 0.0);
    }

    #[test]
    fn breathable_threshold() {
        assert!(o2_n2(21.0, 79.0).breathable());
        assert!(!o2_n2(10.0, 90.0).breathable());
        assert!(!GasMixture::default().breathable());
        assert!(GasMixture::standard_air().breathable());
    }

    #[test]
    fn toxic_and_flammable() {
        let mut m = o2_n2(21.0, 79.0);
        assert!(!m.toxic());
        assert!(!m.flammable());
        m.add(GasType::CarbonDioxide, 6.0);
        assert!(m.toxic());

        let mut p = o2_n2(21.0, 79.0);
        p.add(GasType::Plasma, 0.01);
        assert!(p.toxic());
        assert!(p.flammable());

        let mut h = GasMixture::default();
        h.add(GasType::Hydrogen, 1.0);
        assert!(h.flammable());
        assert!(!h.toxic());
    }

    #[test]
    fn standard_air_is_one_atmosphere() {
        let air = GasMixture::standard_air();
        assert!((air.pressure() - ONE_ATMOSPHERE).abs() < 1e-6);
    }

    #[test]
    fn merge_adds_gas_and_averages_temperature() {
        let mut a = o2_n2(10.0, 0.0);
        let mut b = GasMixture::new(393.0, 100.0);
        b.add(GasType::Oxygen, 5.0);
        b.add(GasType::Plasma, 1.0);
        a.merge(&b);
        assert_eq!(a.moles(GasType::Oxygen), 15.0);
        assert_eq!(a.moles(GasType::Plasma), 1.0);
        assert!((a.temperature() - 343.0).abs() < 1e-9);
        assert_eq!(b.moles(GasType::Oxygen), 5.0);
    }

    #[test]
    fn equalize_conserves_moles_and_moves_every_gas() {
        let mut high = GasMixture::default();
        high.add(GasType::Oxygen, 20.0);
        high.add(GasType::Plasma, 20.0);
        let mut low = GasMixture::default();
        low.add(GasType::Nitrogen, 5.0);
        let total = high.total_moles() + low.total_moles();

        low.equalize(&mut high, 0.5);
        assert!((high.total_moles() + low.total_moles() - total).abs() < 1e-9);
        assert!(low.has_gas(GasType::Oxygen));
        assert!(low.has_gas(GasType::Plasma));
        assert!((low.moles(GasType::Oxygen) - low.moles(GasType::Plasma)).abs() < 1e-9);
        assert!(high.pressure() > low.pressure());
    }

    #[test]
    fn full_rate_levels_equal_volumes() {
        let mut a = o2_n2(30.0, 0.0);
        let mut b = GasMixture::default();
        b.add(GasType::Nitrogen, 0.0);
        a.equalize(&mut b, 1.0);
        assert!((a.pressure() - b.pressure()).abs() < 1e-6);
        assert!((a.total_moles() - 15.0).abs() < 1e-9);
    }

    #[test]
    fn equalize_into_vacuum_and_temperature() {
        let mut vacuum = GasMixture::new(100.0, 100.0);
        let mut room = o2_n2(20.0, 0.0);
        vacuum.equalize(&mut room, 0.1);
        assert!(vacuum.total_moles() > 0.0);
        // 10% of the 193 K gap.
        assert!((vacuum.temperature() - 119.3).abs() < 1e-9);
        assert!((room.temperature() - 273.7).abs() < 1e-9);

        let mut a = GasMixture::default();
        let mut b = GasMixture::new(500.0, 100.0);
        a.equalize(&mut b, 0.5);
        assert_eq!(b.temperature(), 500.0);
    }

    #[test]
    fn snapshot_restores_and_derives_pressure() {
        let m = o2_n2(10.0, 38.0);
        let mut snap = m.snapshot();
        assert_eq!(snap.gases.len(), 2);
        snap.pressure = -1.0;
        let back = GasMixture::from_snapshot(&snap);
        assert_eq!(back, m);

        let json = serde_json::to_value(m.snapshot()).expect("serialize");
        assert_eq!(json["gases"]["oxygen"], 10.0);
        assert_eq!(json["volume"], 100.0);
    }

    #[test]
    fn parse_gas_names() {
        assert_eq!("plasma".parse::<GasType>(), Ok(GasType::Plasma));
        assert_eq!("Carbon Dioxide".parse::<GasType>(), Ok(GasType::CarbonDioxide));
        assert_eq!("water-vapor".parse::<GasType>(), Ok(GasType::WaterVapor));
        assert!("phlogiston".parse::<GasType>().is_err());
        assert_eq!(GasType::CarbonDioxide.to_string(), "Carbon Dioxide");
    }
}
