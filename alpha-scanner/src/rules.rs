//! Signal partition rules
//!
//! Splits a table into named buckets:
//! - Categorical: one bucket per distinct value of a column
//! - Label-contains: a bucket per label substring (non-exclusive)
//! - Expression: a bucket per numeric predicate
//!
//! Rules are configured as text, e.g.
//! `label:signals:BREAKOUT,PULLBACK,SMC,MOMENTUM`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, ScanError};
use crate::expr::Predicate;
use crate::types::{Row, Table, normalize_column};

/// Labels used when a label rule lists none
pub const DEFAULT_LABELS: [&str; 4] = ["BREAKOUT", "PULLBACK", "SMC", "MOMENTUM"];

/// Categorical bucket holding rows with no value in the grouping column
pub const BLANK_BUCKET: &str = "(blank)";

/// How rows are grouped into tabs
#[derive(Debug, Clone, PartialEq)]
pub enum PartitionRule {
    Categorical {
        column: String,
    },
    LabelContains {
        column: String,
        labels: Vec<String>,
    },
    Expression {
        rules: Vec<NamedPredicate>,
    },
}

/// A bucket name and the predicate rows must satisfy
#[derive(Debug, Clone, PartialEq)]
pub struct NamedPredicate {
    pub name: String,
    pub predicate: Predicate,
}

/// Rows of one bucket, or why the bucket could not be computed
#[derive(Debug)]
pub struct Bucket<'a> {
    pub name: String,
    pub rows: Result<Vec<&'a Row>>,
}

impl Bucket<'_> {
    pub fn len(&self) -> usize {
        self.rows.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PartitionRule {
    /// Column the rule groups on, if it groups on a single column
    pub fn label_column(&self) -> Option<&str> {
        match self {
            PartitionRule::Categorical { column } | PartitionRule::LabelContains { column, .. } => {
                Some(column)
            }
            PartitionRule::Expression { .. } => None,
        }
    }

    /// Partition a table. Row order inside every bucket follows the table.
    ///
    /// Categorical buckets cover every row exactly once; blank values
    /// share the trailing `(blank)` bucket.
    /// A missing grouping column fails the whole categorical partition.
    /// Label and expression rules report a missing column on the affected
    /// bucket only.
    pub fn partition<'a>(&self, table: &'a Table) -> Result<Vec<Bucket<'a>>> {
        match self {
            PartitionRule::Categorical { column } => {
                if !table.has_column(column) {
                    return Err(ScanError::missing_column(column.clone()));
                }

                let mut groups: BTreeMap<String, Vec<&'a Row>> = BTreeMap::new();
                let mut blank: Vec<&'a Row> = Vec::new();
                for row in table.rows() {
                    match row.text(column) {
                        Some(value) => groups.entry(value.trim().to_string()).or_default().push(row),
                        None => blank.push(row),
                    }
                }

                let mut buckets: Vec<Bucket<'a>> = groups
                    .into_iter()
                    .map(|(name, rows)| Bucket { name, rows: Ok(rows) })
                    .collect();
                if !blank.is_empty() {
                    buckets.push(Bucket {
                        name: BLANK_BUCKET.to_string(),
                        rows: Ok(blank),
                    });
                }
                Ok(buckets)
            }
            PartitionRule::LabelContains { column, labels } => {
                let present = table.has_column(column);
                Ok(labels
                    .iter()
                    .map(|label| {
                        let rows = if present {
                            Ok(table
                                .rows()
                                .iter()
                                .filter(|row| {
                                    row.text(column).is_some_and(|text| text.contains(label.as_str()))
                                })
                                .collect())
                        } else {
                            Err(ScanError::missing_column(column.clone()))
                        };
                        Bucket {
                            name: label.clone(),
                            rows,
                        }
                    })
                    .collect())
            }
            PartitionRule::Expression { rules } => Ok(rules
                .iter()
                .map(|rule| {
                    let missing = rule
                        .predicate
                        .columns()
                        .into_iter()
                        .find(|c| !table.has_column(c));
                    let rows = match missing {
                        Some(column) => Err(ScanError::missing_column(column)),
                        None => Ok(table
                            .rows()
                            .iter()
                            .filter(|row| rule.predicate.matches(row))
                            .collect()),
                    };
                    Bucket {
                        name: rule.name.clone(),
                        rows,
                    }
                })
                .collect()),
        }
    }
}

impl FromStr for PartitionRule {
    type Err = ScanError;

    /// Parse `categorical:<column>`, `label:<column>[:<l1>,<l2>..]`
    /// or `expr:<name>=<predicate>;<name>=<predicate>..`
    fn from_str(text: &str) -> Result<Self> {
        let (kind, rest) = text
            .trim()
            .split_once(':')
            .ok_or_else(|| ScanError::Rule(format!("'{text}' has no rule kind")))?;

        match kind.trim().to_ascii_lowercase().as_str() {
            "categorical" | "category" => {
                let column = normalize_column(rest);
                if column.is_empty() {
                    return Err(ScanError::Rule("categorical rule needs a column".into()));
                }
                Ok(PartitionRule::Categorical { column })
            }
            "label" | "contains" => {
                let (column, labels) = match rest.split_once(':') {
                    Some((column, labels)) => (column, Some(labels)),
                    None => (rest, None),
                };
                let column = normalize_column(column);
                if column.is_empty() {
                    return Err(ScanError::Rule("label rule needs a column".into()));
                }
                let labels: Vec<String> = match labels {
                    Some(list) => list
                        .split(',')
                        .map(str::trim)
                        .filter(|l| !l.is_empty())
                        .map(String::from)
                        .collect(),
                    None => DEFAULT_LABELS.iter().map(|l| (*l).to_string()).collect(),
                };
                if labels.is_empty() {
                    return Err(ScanError::Rule("label rule needs at least one label".into()));
                }
                Ok(PartitionRule::LabelContains { column, labels })
            }
            "expr" | "expression" => {
                let mut rules = Vec::new();
                for part in rest.split(';').map(str::trim).filter(|p| !p.is_empty()) {
                    let (name, predicate) = part.split_once('=').ok_or_else(|| {
                        ScanError::Rule(format!("'{part}' should look like Name=<predicate>"))
                    })?;
                    let name = name.trim();
                    if name.is_empty() {
                        return Err(ScanError::Rule(format!("'{part}' has no bucket name")));
                    }
                    rules.push(NamedPredicate {
                        name: name.to_string(),
                        predicate: Predicate::parse(predicate)?,
                    });
                }
                if rules.is_empty() {
                    return Err(ScanError::Rule("expression rule needs at least one predicate".into()));
                }
                Ok(PartitionRule::Expression { rules })
            }
            other => Err(ScanError::Rule(format!("unknown rule kind '{other}'"))),
        }
    }
}

impl fmt::Display for PartitionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionRule::Categorical { column } => write!(f, "categorical:{column}"),
            PartitionRule::LabelContains { column, labels } => {
                write!(f, "label:{column}:{}", labels.join(","))
            }
            PartitionRule::Expression { rules } => {
                let parts: Vec<String> = rules
                    .iter()
                    .map(|r| format!("{}={}", r.name, r.predicate))
                    .collect();
                write!(f, "expr:{}", parts.join(";"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Cell;

    fn scan_row(name: &str, strategy: &str, signals: &str, close: f64, high20: Option<f64>) -> Row {
        Row::new()
            .with("name", Cell::Text(name.into()))
            .with("strategy", Cell::Text(strategy.into()))
            .with("signals", Cell::Text(signals.into()))
            .with("close", Cell::Number(close))
            .with("high20", high20.map_or(Cell::Blank, Cell::Number))
    }

    fn scan_table() -> Table {
        Table::new(
            "Data_Scan",
            &["name", "strategy", "signals", "close", "high20"],
            vec![
                scan_row("AAA", "Swing", "BREAKOUT", 105.0, Some(100.0)),
                scan_row("BBB", "Breakout", "BREAKOUT_PULLBACK", 90.0, Some(100.0)),
                scan_row("CCC", "Swing", "SMC", 50.0, None),
                scan_row("DDD", "", "momentum", 10.0, Some(9.0)),
            ],
        )
    }

    fn names(bucket: &Bucket<'_>) -> Vec<String> {
        bucket
            .rows
            .as_ref()
            .unwrap()
            .iter()
            .map(|r| r.text("name").unwrap())
            .collect()
    }

    #[test]
    fn test_categorical_partitions_each_row_once() {
        let table = scan_table();
        let rule: PartitionRule = "categorical:strategy".parse().unwrap();
        let buckets = rule.partition(&table).unwrap();

        let bucket_names: Vec<_> = buckets.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(bucket_names, vec!["Breakout", "Swing", BLANK_BUCKET]);
        assert_eq!(names(&buckets[1]), vec!["AAA", "CCC"]);
        assert_eq!(names(&buckets[2]), vec!["DDD"]);

        // Every row appears in exactly one bucket
        let total: usize = buckets.iter().map(Bucket::len).sum();
        assert_eq!(total, table.len());
    }

    #[test]
    fn test_categorical_keeps_blank_rows() {
        let table = Table::new(
            "Data_Scan",
            &["name", "strategy"],
            vec![
                Row::new()
                    .with("name", Cell::Text("AAA".into()))
                    .with("strategy", Cell::Text("Swing".into())),
                Row::new()
                    .with("name", Cell::Text("BBB".into()))
                    .with("strategy", Cell::Text(String::new())),
            ],
        );
        let rule: PartitionRule = "categorical:strategy".parse().unwrap();
        let buckets = rule.partition(&table).unwrap();

        assert_eq!(buckets.len(), 2);
        assert_eq!(names(&buckets[0]), vec!["AAA"]);
        assert_eq!(buckets[1].name, BLANK_BUCKET);
        assert_eq!(names(&buckets[1]), vec!["BBB"]);
        assert_eq!(buckets.iter().map(Bucket::len).sum::<usize>(), table.len());
    }

    #[test]
    fn test_label_membership_is_not_exclusive() {
        let table = scan_table();
        let rule: PartitionRule = "label:signals".parse().unwrap();
        let buckets = rule.partition(&table).unwrap();

        assert_eq!(buckets.len(), 4);
        assert_eq!(names(&buckets[0]), vec!["AAA", "BBB"]); // BREAKOUT
        assert_eq!(names(&buckets[1]), vec!["BBB"]); // PULLBACK
        assert_eq!(names(&buckets[2]), vec!["CCC"]); // SMC
        // Case-sensitive: "momentum" does not match MOMENTUM
        assert!(buckets[3].is_empty());
    }

    #[test]
    fn test_expression_breakout_scenario() {
        let table = scan_table();
        let rule: PartitionRule = "expr:Breakout=close >= high20".parse().unwrap();
        let buckets = rule.partition(&table).unwrap();

        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].name, "Breakout");
        // CCC has a blank high20 and is skipped without error
        assert_eq!(names(&buckets[0]), vec!["AAA", "DDD"]);
    }

    #[test]
    fn test_missing_column_isolated_per_bucket() {
        let table = scan_table();
        let rule: PartitionRule =
            "expr:Breakout=close >= high20;Double Bottom=abs(low10 - low20) / low20 < 0.005"
                .parse()
                .unwrap();
        let buckets = rule.partition(&table).unwrap();

        assert!(buckets[0].rows.is_ok());
        assert!(matches!(
            buckets[1].rows,
            Err(ScanError::MissingColumn { ref column }) if column == "low10"
        ));
    }

    #[test]
    fn test_missing_label_column() {
        let table = scan_table();
        let rule: PartitionRule = "label:strategy_label:BREAKOUT".parse().unwrap();
        let buckets = rule.partition(&table).unwrap();
        assert!(matches!(buckets[0].rows, Err(ScanError::MissingColumn { .. })));

        let rule: PartitionRule = "categorical:sector".parse().unwrap();
        assert!(matches!(rule.partition(&table), Err(ScanError::MissingColumn { .. })));
    }

    #[test]
    fn test_empty_table_yields_no_populated_buckets() {
        let table = Table::new("Data_Scan", &["name", "signals", "strategy"], vec![]);

        let categorical: PartitionRule = "categorical:strategy".parse().unwrap();
        assert!(categorical.partition(&table).unwrap().is_empty());

        let label: PartitionRule = "label:signals".parse().unwrap();
        assert!(label.partition(&table).unwrap().iter().all(Bucket::is_empty));
    }

    #[test]
    fn test_rule_parsing() {
        let rule: PartitionRule = "label: Signals :BREAKOUT, SMC".parse().unwrap();
        assert_eq!(
            rule,
            PartitionRule::LabelContains {
                column: "signals".into(),
                labels: vec!["BREAKOUT".into(), "SMC".into()],
            }
        );
        assert_eq!(rule.to_string(), "label:signals:BREAKOUT,SMC");

        assert!("strategy".parse::<PartitionRule>().is_err());
        assert!("bogus:x".parse::<PartitionRule>().is_err());
        assert!("categorical:".parse::<PartitionRule>().is_err());
        assert!("expr:close >= high20".parse::<PartitionRule>().is_err());
        assert!("expr:".parse::<PartitionRule>().is_err());
    }

    #[test]
    fn test_label_column() {
        let rule: PartitionRule = "categorical:Strategy".parse().unwrap();
        assert_eq!(rule.label_column(), Some("strategy"));

        let rule: PartitionRule = "expr:Breakout=close >= high20".parse().unwrap();
        assert_eq!(rule.label_column(), None);
    }
}
