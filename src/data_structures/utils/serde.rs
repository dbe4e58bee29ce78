pub mod money {
    use std::str::FromStr;

    use rust_decimal::{Decimal, RoundingStrategy};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(decimal: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{:.2}", decimal))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        let string = String::deserialize(deserializer)?;
        parse(&string).map_err(serde::de::Error::custom)
    }

    /// Parses a non-negative amount, keeping 2 fractional digits.
    pub fn parse(value: &str) -> Result<Decimal, String> {
        let decimal = Decimal::from_str(value.trim())
            .or_else(|_| Decimal::from_scientific(value.trim()))
            .map_err(|err| format!("invalid amount '{value}': {err}"))?;
        if decimal.is_sign_negative() && !decimal.is_zero() {
            return Err(format!("amount must not be negative, got {decimal}"));
        }

        Ok(decimal.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::money;

    #[test]
    fn test_parse_rounds_to_cents() {
        assert_eq!(money::parse("12.345").unwrap(), Decimal::new(1235, 2));
        assert_eq!(money::parse(" 500 ").unwrap(), Decimal::from(500));
    }

    #[test]
    fn test_parse_rejects_negative_and_garbage() {
        assert!(money::parse("-1.00").is_err());
        assert!(money::parse("ten").is_err());
    }

    #[test]
    fn test_serialize_keeps_two_digits() {
        #[derive(serde::Serialize)]
        struct Wrapper {
            #[serde(with = "money")]
            amt: Decimal,
        }

        let json = serde_json::to_string(&Wrapper {
            amt: Decimal::from(500),
        })
        .unwrap();
        assert_eq!(json, r#"{"amt":"500.00"}"#);
    }
}
