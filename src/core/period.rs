//! Goal periods and the keys/labels identifying the period a date falls in.

use crate::core::dates::month_abbreviation;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GoalPeriod {
    #[default]
    Mensal,
    Trimestral,
    Semestral,
    Anual,
    Semanal,
    #[serde(rename = "Diário")]
    Diario,
}

impl Display for GoalPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            GoalPeriod::Mensal => "Mensal",
            GoalPeriod::Trimestral => "Trimestral",
            GoalPeriod::Semestral => "Semestral",
            GoalPeriod::Anual => "Anual",
            GoalPeriod::Semanal => "Semanal",
            GoalPeriod::Diario => "Diário",
        })
    }
}

impl FromStr for GoalPeriod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mensal" | "monthly" => Ok(GoalPeriod::Mensal),
            "trimestral" | "quarterly" => Ok(GoalPeriod::Trimestral),
            "semestral" => Ok(GoalPeriod::Semestral),
            "anual" | "yearly" => Ok(GoalPeriod::Anual),
            "semanal" | "weekly" => Ok(GoalPeriod::Semanal),
            "diário" | "diario" | "daily" => Ok(GoalPeriod::Diario),
            _ => Err(anyhow::anyhow!("Invalid goal period: {}", s)),
        }
    }
}

/// Key of the period `today` falls in, e.g. `2025-03`, `2025-Q1`, `2025-W09`.
pub fn period_key(period: GoalPeriod, today: NaiveDate) -> String {
    let year = today.year();
    let month = today.month();
    match period {
        GoalPeriod::Diario => format!("{year}-{month:02}-{:02}", today.day()),
        GoalPeriod::Semanal => {
            let jan1 = NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(today);
            let offset = jan1.weekday().num_days_from_sunday();
            let week = (today.ordinal0() + offset + 1).div_ceil(7);
            format!("{year}-W{week:02}")
        }
        GoalPeriod::Mensal => format!("{year}-{month:02}"),
        GoalPeriod::Trimestral => format!("{year}-Q{}", (month - 1) / 3 + 1),
        GoalPeriod::Semestral => format!("{year}-S{}", if month <= 6 { 1 } else { 2 }),
        GoalPeriod::Anual => format!("{year}"),
    }
}

/// Human label for a key produced by [`period_key`].
pub fn period_label(key: &str) -> String {
    if key.is_empty() {
        return "Período Desconhecido".to_string();
    }

    let parts: Vec<&str> = key.split('-').collect();
    let year = parts[0];
    let Some(suffix) = parts.get(1) else {
        return format!("Ano {year}");
    };

    if let Some(quarter) = suffix.strip_prefix('Q') {
        return format!("{quarter}º Trimestre de {year}");
    }
    if let Some(semester) = suffix.strip_prefix('S') {
        return format!("{semester}º Semestre de {year}");
    }
    if let Some(week) = suffix.strip_prefix('W') {
        return format!("Semana {week} de {year}");
    }
    if let Some(day) = parts.get(2) {
        return format!("{day}/{suffix}/{year}");
    }

    match suffix.parse::<u32>().ok().and_then(month_abbreviation) {
        Some(name) => format!("{name} / {year}"),
        None => key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_period_keys() {
        let today = date(2025, 8, 7);
        assert_eq!(period_key(GoalPeriod::Mensal, today), "2025-08");
        assert_eq!(period_key(GoalPeriod::Trimestral, today), "2025-Q3");
        assert_eq!(period_key(GoalPeriod::Semestral, today), "2025-S2");
        assert_eq!(period_key(GoalPeriod::Anual, today), "2025");
        assert_eq!(period_key(GoalPeriod::Diario, today), "2025-08-07");
    }

    #[test]
    fn test_week_key_counts_from_first_sunday() {
        // 2025-01-01 is a Wednesday.
        assert_eq!(period_key(GoalPeriod::Semanal, date(2025, 1, 1)), "2025-W01");
        assert_eq!(period_key(GoalPeriod::Semanal, date(2025, 1, 4)), "2025-W01");
        assert_eq!(period_key(GoalPeriod::Semanal, date(2025, 1, 5)), "2025-W02");
    }

    #[test]
    fn test_period_labels() {
        assert_eq!(period_label("2025-03"), "Mar / 2025");
        assert_eq!(period_label("2025-Q1"), "1º Trimestre de 2025");
        assert_eq!(period_label("2025-S2"), "2º Semestre de 2025");
        assert_eq!(period_label("2025-W09"), "Semana 09 de 2025");
        assert_eq!(period_label("2025-03-07"), "07/03/2025");
        assert_eq!(period_label("2025"), "Ano 2025");
        assert_eq!(period_label(""), "Período Desconhecido");
    }

    #[test]
    fn test_period_serde_names() {
        let period: GoalPeriod = serde_json::from_str("\"Diário\"").unwrap();
        assert_eq!(period, GoalPeriod::Diario);
        assert_eq!(serde_json::to_string(&GoalPeriod::Anual).unwrap(), "\"Anual\"");
    }
}
