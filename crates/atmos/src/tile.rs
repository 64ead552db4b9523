use serde::{Deserialize, Serialize};

use crate::config::{AtmosConfig, FireConfig};
use crate::gas::{GasMixture, GasMixtureSnapshot, GasType};

/// Atmospheric state of one grid cell.
#[derive(Debug, Clone, PartialEq)]
pub struct TileAtmos {
    air: GasMixture,
    sealed: bool,
    active: bool,
    fire_temperature: f64,
    on_fire: bool,
}

impl Default for TileAtmos {
    fn default() -> Self {
        Self::new(GasMixture::default())
    }
}

impl TileAtmos {
    pub fn new(air: GasMixture) -> Self {
        Self {
            air,
            sealed: false,
            active: true,
            fire_temperature: 0.0,
            on_fire: false,
        }
    }

    pub fn air(&self) -> &GasMixture {
        &self.air
    }

    pub fn air_mut(&mut self) -> &mut GasMixture {
        &mut self.air
    }

    /// Sealed tiles neither process nor exchange with neighbors.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn set_sealed(&mut self, sealed: bool) {
        self.sealed = sealed;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn fire_temperature(&self) -> f64 {
        self.fire_temperature
    }

    pub fn on_fire(&self) -> bool {
        self.on_fire
    }

    /// Start a fire. Fails if already burning or nothing here can burn.
    pub fn ignite(&mut self) -> bool {
        self.ignite_with(&FireConfig::default())
    }

    pub fn ignite_with(&mut self, fire: &FireConfig) -> bool {
        if self.on_fire || !self.air.flammable() {
            return false;
        }
        self.on_fire = true;
        self.fire_temperature = fire.ignition_temperature;
        true
    }

    pub fn extinguish(&mut self) {
        self.on_fire = false;
        self.fire_temperature = 0.0;
    }

    pub fn smoky(&self) -> bool {
        self.air.fraction(GasType::CarbonDioxide) > 0.1 || self.air.fraction(GasType::Plasma) > 0.05
    }

    /// One step with the default tuning.
    pub fn tick(&mut self, delta: f64, neighbors: &mut [&mut TileAtmos]) {
        self.tick_with(&AtmosConfig::default(), delta, neighbors);
    }

    /// Burn, then diffuse into each unsealed neighbor, then run the optional
    /// conduction exchange. Inactive or sealed tiles do nothing.
    pub fn tick_with(&mut self, config: &AtmosConfig, delta: f64, neighbors: &mut [&mut TileAtmos]) {
        if !self.active || self.sealed {
            return;
        }
        if self.on_fire {
            self.burn(&config.fire, delta);
        }

        let diffusion = delta * config.diffusion_rate;
        for neighbor in neighbors.iter_mut().filter(|n| !n.sealed) {
            self.air.equalize(&mut neighbor.air, diffusion);
        }

        if config.conduction_rate > 0.0 {
            let rate = delta * config.conduction_rate;
            for neighbor in neighbors.iter_mut().filter(|n| !n.sealed) {
                let gap = neighbor.air.temperature() - self.air.temperature();
                if gap == 0.0 {
                    continue;
                }
                let exchange = gap * rate;
                self.air.set_temperature(self.air.temperature() + exchange);
                neighbor
                    .air
                    .set_temperature(neighbor.air.temperature() - exchange);
            }
        }
    }

    fn burn(&mut self, fire: &FireConfig, delta: f64) {
        for gas in GasType::FLAMMABLE {
            let amount = self.air.moles(gas);
            if amount <= 0.0 {
                continue;
            }
            let consumed = self.air.remove(gas, amount * delta * fire.burn_rate);
            self.fire_temperature += consumed * fire.heat_per_mole;
        }

        self.fire_temperature = (self.fire_temperature - delta * fire.decay_rate).max(0.0);
        self.on_fire = self.fire_temperature > fire.ignition_temperature;

        let gap = self.fire_temperature - self.air.temperature();
        let step = (delta * fire.heating_rate).min(gap.abs()).copysign(gap);
        self.air.set_temperature(self.air.temperature() + step);
    }

    pub fn snapshot(&self) -> TileAtmosSnapshot {
        TileAtmosSnapshot {
            air: self.air.snapshot(),
            sealed: self.sealed,
            active: self.active,
            fire_temperature: self.fire_temperature,
            on_fire: self.on_fire,
        }
    }

    pub fn from_snapshot(snapshot: &TileAtmosSnapshot) -> Self {
        Self {
            air: GasMixture::from_snapshot(&snapshot.air),
            sealed: snapshot.sealed,
            active: snapshot.active,
            fire_temperature: snapshot.fire_temperature.max(0.0),
            on_fire: snapshot.on_fire,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileAtmosSnapshot {
    pub air: GasMixtureSnapshot,
    #[serde(default)]
    pub sealed: bool,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub fire_temperature: f64,
    #[serde(default)]
    pub on_fire: bool,
}

fn default_active() -> bool {
    true
}
