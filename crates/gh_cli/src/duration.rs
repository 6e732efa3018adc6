use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A duration written as `90s`, `30m`, `2h`, `1d` or combinations such as
/// `1h15m`. A trailing bare number counts as seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDuration(pub Duration);

fn unit_seconds(unit: char) -> Option<u64> {
    match unit {
        's' => Some(1),
        'm' => Some(60),
        'h' => Some(3600),
        'd' => Some(86400),
        _ => None,
    }
}

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut total: u64 = 0;
        let mut digits = String::new();

        for c in s.trim().chars() {
            if c.is_ascii_digit() {
                digits.push(c);
                continue;
            }
            let unit = unit_seconds(c).ok_or_else(|| format!("invalid duration unit '{}' in {:?}", c, s))?;
            let value: u64 = digits
                .parse()
                .map_err(|_| format!("missing number before '{}' in {:?}", c, s))?;
            total = total.saturating_add(value.saturating_mul(unit));
            digits.clear();
        }

        if !digits.is_empty() {
            let value: u64 = digits.parse().map_err(|_| format!("invalid number in {:?}", s))?;
            total = total.saturating_add(value);
        }
        if total == 0 {
            return Err(format!("duration {:?} must be positive", s));
        }
        Ok(HumanDuration(Duration::from_secs(total)))
    }
}

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut secs = self.0.as_secs();
        let mut wrote = false;
        for (unit, size) in [('d', 86400), ('h', 3600), ('m', 60), ('s', 1)] {
            if secs >= size {
                write!(f, "{}{}", secs / size, unit)?;
                secs %= size;
                wrote = true;
            }
        }
        if !wrote {
            f.write_str("0s")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: &str) -> u64 {
        s.parse::<HumanDuration>().unwrap().0.as_secs()
    }

    #[test]
    fn test_parse() {
        assert_eq!(secs("2h"), 7200);
        assert_eq!(secs("1h15m30s"), 4530);
        assert_eq!(secs("1d"), 86400);
        assert_eq!(secs("45"), 45);
        assert_eq!(secs(" 10m "), 600);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!("".parse::<HumanDuration>().is_err());
        assert!("0s".parse::<HumanDuration>().is_err());
        assert!("h".parse::<HumanDuration>().is_err());
        assert!("2w".parse::<HumanDuration>().is_err());
        assert!("1 h".parse::<HumanDuration>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(HumanDuration(Duration::from_secs(4530)).to_string(), "1h15m30s");
        assert_eq!(HumanDuration(Duration::from_secs(7200)).to_string(), "2h");
    }
}
