//! # Temperature acquisition and conversion.
//!
//! [`TemperatureReader`] turns one raw analog sample into a calibrated
//! Celsius value using the LMT86 linear transfer characteristic. Hardware
//! access sits behind the [`AdcDriver`] seam: `sample_raw` triggers one
//! acquisition, `calibrate` maps the raw code to millivolts.
//!
//! A driver failure is unrecoverable for the running node — the error
//! propagates out of the sequencer and aborts the runtime.

use std::sync::Arc;

use crate::error::SensorError;

/// LMT86 output voltage at the reference temperature, in millivolts.
pub const LMT86_V0_MV: f64 = 1777.3;
/// LMT86 slope, millivolts per degree Celsius.
pub const LMT86_TC_MV_PER_C: f64 = 10.888;
/// Reference temperature for the linear fit, degrees Celsius.
pub const LMT86_REF_TEMP_C: f64 = 30.0;

/// Analog front-end collaborator.
///
/// Implementations own the ADC unit configuration and the calibration
/// scheme; the reader only sees raw codes and millivolts.
pub trait AdcDriver: Send + Sync + 'static {
    /// Triggers one hardware acquisition and returns the raw ADC code.
    fn sample_raw(&self) -> Result<u16, SensorError>;

    /// Maps a raw ADC code to millivolts via the calibration scheme.
    fn calibrate(&self, raw: u16) -> Result<f64, SensorError>;
}

/// Converts raw analog samples into calibrated Celsius readings.
pub struct TemperatureReader {
    adc: Arc<dyn AdcDriver>,
}

impl TemperatureReader {
    /// Creates a reader on top of the given analog driver.
    pub fn new(adc: Arc<dyn AdcDriver>) -> Self {
        Self { adc }
    }

    /// Acquires one sample and returns its temperature in degrees Celsius.
    ///
    /// Computation: `(V0 − mV) / slope + 30.0` with the LMT86 constants.
    /// Driver errors propagate unmodified; there is no retry.
    pub fn read_temperature(&self) -> Result<f64, SensorError> {
        let raw = self.adc.sample_raw()?;
        let millivolts = self.adc.calibrate(raw)?;
        Ok(celsius_from_millivolts(millivolts))
    }
}

/// Applies the LMT86 linear transfer characteristic.
#[inline]
pub fn celsius_from_millivolts(millivolts: f64) -> f64 {
    (LMT86_V0_MV - millivolts) / LMT86_TC_MV_PER_C + LMT86_REF_TEMP_C
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedAdc {
        millivolts: f64,
    }

    impl AdcDriver for FixedAdc {
        fn sample_raw(&self) -> Result<u16, SensorError> {
            Ok(2048)
        }

        fn calibrate(&self, _raw: u16) -> Result<f64, SensorError> {
            Ok(self.millivolts)
        }
    }

    struct BrokenAdc;

    impl AdcDriver for BrokenAdc {
        fn sample_raw(&self) -> Result<u16, SensorError> {
            Err(SensorError::Acquisition {
                reason: "unit not configured".to_string(),
            })
        }

        fn calibrate(&self, _raw: u16) -> Result<f64, SensorError> {
            unreachable!("calibrate is never reached when sampling fails")
        }
    }

    #[test]
    fn reference_voltage_maps_to_reference_temperature() {
        // At V0 the formula collapses to the reference temperature exactly.
        assert_eq!(celsius_from_millivolts(1777.3), 30.0);
    }

    #[test]
    fn ten_degrees_above_reference() {
        // 1668.42 mV is one slope-decade below V0: 30 + 10 = 40 °C.
        let celsius = celsius_from_millivolts(1668.42);
        assert!((celsius - 40.0).abs() < 0.01, "got {celsius}");
    }

    #[test]
    fn reader_applies_formula_to_calibrated_sample() {
        let reader = TemperatureReader::new(Arc::new(FixedAdc { millivolts: 1777.3 }));
        let celsius = reader.read_temperature().unwrap();
        assert_eq!(celsius, 30.0);
    }

    #[test]
    fn acquisition_failure_propagates() {
        let reader = TemperatureReader::new(Arc::new(BrokenAdc));
        let err = reader.read_temperature().unwrap_err();
        assert_eq!(err.as_label(), "sensor_acquisition");
    }
}
