//! Decimal values on the wire.
//!
//! Clients exchange decimals using the protobuf layout established by .NET
//! serializers (`bcl.Decimal`):
//!
//! ```text
//! message Decimal {
//!   uint64 lo = 1;         // low 64 bits of the 96-bit magnitude
//!   uint32 hi = 2;         // high 32 bits of the magnitude
//!   uint32 signScale = 3;  // bit 0: sign, bits 1..: base-10 scale
//! }
//! ```
//!
//! [`rust_decimal::Decimal`] has the same 96-bit magnitude and 0..=28 scale,
//! so conversion is lossless in both directions.

use rust_decimal::Decimal;

use crate::ProtocolError;

/// Largest base-10 scale a 96-bit decimal carries.
const MAX_SCALE: u32 = 28;

/// The protobuf form of a decimal.
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct WireDecimal {
    #[prost(uint64, tag = "1")]
    pub lo: u64,
    #[prost(uint32, tag = "2")]
    pub hi: u32,
    #[prost(uint32, tag = "3")]
    pub sign_scale: u32,
}

impl From<Decimal> for WireDecimal {
    fn from(value: Decimal) -> Self {
        let magnitude = value.mantissa().unsigned_abs();
        let sign = u32::from(value.is_sign_negative() && !value.is_zero());
        Self {
            lo: magnitude as u64,
            hi: (magnitude >> 64) as u32,
            sign_scale: (value.scale() << 1) | sign,
        }
    }
}

impl TryFrom<WireDecimal> for Decimal {
    type Error = ProtocolError;

    fn try_from(wire: WireDecimal) -> Result<Self, Self::Error> {
        let scale = wire.sign_scale >> 1;
        if scale > MAX_SCALE {
            return Err(ProtocolError::InvalidDecimal(format!(
                "scale {scale} exceeds {MAX_SCALE}"
            )));
        }
        let negative = wire.sign_scale & 1 == 1;
        Ok(Decimal::from_parts(
            wire.lo as u32,
            (wire.lo >> 32) as u32,
            wire.hi,
            negative,
            scale,
        ))
    }
}
