use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartialDate {
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
}

impl PartialDate {
    pub const fn year(year: i32) -> Self {
        Self {
            year,
            month: None,
            day: None,
        }
    }

    pub const fn new(year: i32, month: Option<u32>, day: Option<u32>) -> Self {
        Self { year, month, day }
    }

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidDate(raw.to_string());
        let mut parts = raw.trim().split('-');
        let year = parts
            .next()
            .filter(|part| !part.is_empty())
            .and_then(|part| part.parse::<i32>().ok())
            .ok_or_else(invalid)?;
        let month = match parts.next() {
            Some(part) => Some(part.parse::<u32>().map_err(|_| invalid())?),
            None => None,
        };
        let day = match parts.next() {
            Some(part) => Some(part.parse::<u32>().map_err(|_| invalid())?),
            None => None,
        };
        if parts.next().is_some() {
            return Err(invalid());
        }
        let date = Self { year, month, day };
        date.validate()?;
        Ok(date)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let invalid = || ValidationError::InvalidDate(self.to_string());
        match (self.month, self.day) {
            (None, None) => Ok(()),
            (None, Some(_)) => Err(invalid()),
            (Some(month), None) => {
                if (1..=12).contains(&month) {
                    Ok(())
                } else {
                    Err(invalid())
                }
            }
            (Some(month), Some(day)) => NaiveDate::from_ymd_opt(self.year, month, day)
                .map(|_| ())
                .ok_or_else(invalid),
        }
    }

    pub fn compare_known(&self, other: &Self) -> Option<Ordering> {
        match self.year.cmp(&other.year) {
            Ordering::Equal => {}
            ord => return Some(ord),
        }
        let (Some(left_month), Some(right_month)) = (self.month, other.month) else {
            return None;
        };
        match left_month.cmp(&right_month) {
            Ordering::Equal => {}
            ord => return Some(ord),
        }
        let (Some(left_day), Some(right_day)) = (self.day, other.day) else {
            return None;
        };
        Some(left_day.cmp(&right_day))
    }
}

impl fmt::Display for PartialDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.year)?;
        if let Some(month) = self.month {
            write!(f, "-{month:02}")?;
        }
        if let Some(day) = self.day {
            write!(f, "-{day:02}")?;
        }
        Ok(())
    }
}

pub fn check_lifespan(
    birth: Option<&PartialDate>,
    death: Option<&PartialDate>,
) -> Result<(), ValidationError> {
    if let Some(date) = birth {
        date.validate()?;
    }
    if let Some(date) = death {
        date.validate()?;
    }
    if let (Some(birth), Some(death)) = (birth, death) {
        if death.compare_known(birth) == Some(Ordering::Less) {
            return Err(ValidationError::DeathBeforeBirth {
                birth: birth.to_string(),
                death: death.to_string(),
            });
        }
    }
    Ok(())
}
