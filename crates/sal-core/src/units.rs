// sal-core/src/units.rs

use uom::si::f64::Volume as UomVolume;

pub type Volume = UomVolume;

#[inline]
pub fn m3(v: f64) -> Volume {
    use uom::si::volume::cubic_meter;
    Volume::new::<cubic_meter>(v)
}

#[inline]
pub fn liters(v: f64) -> Volume {
    use uom::si::volume::liter;
    Volume::new::<liter>(v)
}

#[inline]
pub fn as_m3(v: Volume) -> f64 {
    use uom::si::volume::cubic_meter;
    v.get::<cubic_meter>()
}

#[inline]
pub fn as_liters(v: Volume) -> f64 {
    use uom::si::volume::liter;
    v.get::<liter>()
}

pub mod constants {
    /// H2O [g/mol].
    pub const WATER_MOLAR_MASS_G_PER_MOL: f64 = 18.015_28;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn liters_to_cubic_meters() {
        assert!((as_m3(liters(1500.0)) - 1.5).abs() < 1e-12);
        assert!((as_liters(m3(0.25)) - 250.0).abs() < 1e-9);
    }

    #[test]
    fn volumes_subtract_across_units() {
        let left = m3(2.0) - liters(500.0);
        assert!((as_m3(left) - 1.5).abs() < 1e-12);
    }
}
