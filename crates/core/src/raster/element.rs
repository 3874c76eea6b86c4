//! Cell value trait for rasters

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a raster cell.
///
/// Covers the sample formats found in Level-2 COG bands (unsigned and
/// signed integers) and the floating types used for derived grids.
pub trait RasterElement:
    Copy + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Fill value used where no source sample exists.
    ///
    /// Integers use zero, the Landsat Collection 2 fill value; floats use NaN.
    fn default_nodata() -> Self;

    /// Check if this value represents no-data
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Whether this type is a floating point type
    fn is_float() -> bool;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }

    /// Convert from f64, saturating to `default_nodata` when out of range
    fn from_f64(value: f64) -> Self {
        <Self as NumCast>::from(value).unwrap_or_else(Self::default_nodata)
    }
}

macro_rules! impl_integer_element {
    ($($t:ty),*) => {$(
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                0
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata.map_or(false, |nd| *self == nd)
            }

            fn is_float() -> bool {
                false
            }
        }
    )*};
}

macro_rules! impl_float_element {
    ($($t:ty),*) => {$(
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                <$t>::NAN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                self.is_nan() || nodata.map_or(false, |nd| *self == nd)
            }

            fn is_float() -> bool {
                true
            }
        }
    )*};
}

impl_integer_element!(u8, u16, i16, u32, i32);
impl_float_element!(f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_nodata() {
        assert_eq!(u16::default_nodata(), 0);
        assert!(0u16.is_nodata(Some(0)));
        assert!(!7u16.is_nodata(Some(0)));
        assert!(!0u16.is_nodata(None));
    }

    #[test]
    fn test_float_nan_is_always_nodata() {
        assert!(f64::NAN.is_nodata(None));
        assert!((-9999.0f32).is_nodata(Some(-9999.0)));
        assert!(!1.5f64.is_nodata(Some(-9999.0)));
    }

    #[test]
    fn test_from_f64_out_of_range() {
        assert_eq!(u16::from_f64(70000.0), 0);
        assert_eq!(u16::from_f64(15000.0), 15000);
    }
}
