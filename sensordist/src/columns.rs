//! Picks the timestamp column and the optional value column of a table.
//!
//! Keywords are matched case-insensitively as substrings of the column
//! names. Keywords are tried in priority order and, for each keyword, the
//! columns left to right; the first hit wins. This is not a plain scan in
//! column order: with `date, x, timestamp` the time column is `timestamp`,
//! because `time` outranks `date`. When nothing matches the
//! positional defaults apply: the last column for the timestamp, the second
//! column for the value. A wrong guess degrades the chart, it never fails.

use crate::{Error, Result};

pub const TIME_KEYWORDS: [&str; 3] = ["time", "changed", "date"];
pub const VALUE_KEYWORDS: [&str; 3] = ["temp", "state", "value"];

const VALUE_FALLBACK_INDEX: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub index: usize,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub time: Column,
    pub value: Option<Column>,
}

/// How the value column is chosen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ValueSelection {
    /// Keyword matching with positional fallback.
    #[default]
    Auto,
    Named(String),
    /// Count-only charts.
    Disabled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnOverrides {
    pub time: Option<String>,
    pub value: ValueSelection,
}

pub fn resolve(names: &[String], overrides: &ColumnOverrides) -> Result<ResolvedColumns> {
    let time_index = match &overrides.time {
        Some(name) => position(names, name)?,
        None => find_by_keywords(names, &TIME_KEYWORDS, None).unwrap_or_else(|| {
            tracing::debug!("no timestamp column matched, using the last column");
            names.len().saturating_sub(1)
        }),
    };
    let time = Column {
        index: time_index,
        name: names
            .get(time_index)
            .cloned()
            .ok_or_else(|| Error::UnknownColumn(String::new()))?,
    };

    let value_index = match &overrides.value {
        ValueSelection::Disabled => None,
        ValueSelection::Named(name) => Some(position(names, name)?),
        ValueSelection::Auto => {
            find_by_keywords(names, &VALUE_KEYWORDS, Some(time_index)).or_else(|| {
                tracing::debug!("no value column matched, using the second column");
                (VALUE_FALLBACK_INDEX < names.len() && VALUE_FALLBACK_INDEX != time_index)
                    .then_some(VALUE_FALLBACK_INDEX)
            })
        }
    };
    let value = value_index.map(|index| Column {
        index,
        name: names[index].clone(),
    });

    tracing::info!(
        time = %time.name,
        value = value.as_ref().map_or("-", |c| c.name.as_str()),
        "resolved columns"
    );
    Ok(ResolvedColumns { time, value })
}

fn position(names: &[String], name: &str) -> Result<usize> {
    names
        .iter()
        .position(|n| n == name)
        .ok_or_else(|| Error::UnknownColumn(name.to_owned()))
}

fn find_by_keywords(names: &[String], keywords: &[&str], skip: Option<usize>) -> Option<usize> {
    let lowered = names.iter().map(|n| n.to_lowercase()).collect::<Vec<_>>();
    keywords.iter().find_map(|keyword| {
        lowered
            .iter()
            .enumerate()
            .find(|(i, name)| Some(*i) != skip && name.contains(keyword))
            .map(|(i, _)| i)
    })
}
