//! Structured query predicates.
//!
//! Filters are plain data: a conjunction of column comparisons. Backends
//! translate them into bound-parameter SQL or evaluate them in memory, so no
//! query text is ever assembled from caller input.

use serde::{Deserialize, Serialize};

use crate::model::col;
use crate::schema::{Row, Value, ID_COLUMN};

/// Upper bound on rows returned by recent-activity queries.
pub const RECENT_LIMIT: u64 = 100;

// ─── Predicates ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CmpOp {
    pub fn sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        }
    }

    /// Evaluate `lhs <op> rhs`. Values of different types never match.
    pub fn eval(&self, lhs: &Value, rhs: &Value) -> bool {
        let ord = match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            // SQLite hands booleans back as integers.
            (Value::Int(a), Value::Bool(b)) => (*a != 0).cmp(b),
            _ => return false,
        };
        match self {
            Self::Eq => ord.is_eq(),
            Self::Gt => ord.is_gt(),
            Self::Ge => ord.is_ge(),
            Self::Lt => ord.is_lt(),
            Self::Le => ord.is_le(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub column: String,
    pub op: CmpOp,
    pub value: Value,
}

/// A conjunction of predicates. The empty filter matches every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn with(mut self, column: impl Into<String>, op: CmpOp, value: impl Into<Value>) -> Self {
        self.predicates.push(Predicate {
            column: column.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(column, CmpOp::Eq, value)
    }

    /// Rows whose originating block has not been superseded.
    pub fn not_forked(self) -> Self {
        self.eq(col::FORK, false)
    }

    /// `block_number ∈ (range.from, range.to]`.
    pub fn block_range(self, range: BlockRange) -> Self {
        self.with(col::BLOCK_NUMBER, CmpOp::Gt, range.from)
            .with(col::BLOCK_NUMBER, CmpOp::Le, range.to)
    }

    pub fn time_window(mut self, window: TimeWindow) -> Self {
        self.predicates.extend(window.predicates());
        self
    }

    /// Append every predicate of `other`.
    pub fn and(mut self, other: Filter) -> Self {
        self.predicates.extend(other.predicates);
        self
    }

    /// Equality on every non-zero column of `template`, plus `id > 0`.
    ///
    /// Zero values (`0`, `false`, `""`) are treated as "don't care".
    pub fn from_template(template: &Row) -> Self {
        let mut filter = Self::new().with(ID_COLUMN, CmpOp::Gt, 0i64);
        for (column, value) in template.iter() {
            if !value.is_zero() {
                filter = filter.eq(column, value.clone());
            }
        }
        filter
    }

    /// Equality on every entry of a caller-supplied field map.
    pub fn from_fields(fields: &FieldFilter) -> Self {
        fields
            .iter()
            .fold(Self::new(), |f, (column, value)| f.eq(column.as_str(), value.clone()))
    }

    /// Evaluate against a stored row. Used by the in-memory backend.
    pub fn matches(&self, id: i64, row: &Row) -> bool {
        self.predicates.iter().all(|p| {
            let id_value;
            let lhs = if p.column == ID_COLUMN {
                id_value = Value::Int(id);
                Some(&id_value)
            } else {
                row.get(&p.column)
            };
            lhs.map(|v| p.op.eval(v, &p.value)).unwrap_or(false)
        })
    }
}

/// Column → value equality map used by paginated listing.
pub type FieldFilter = std::collections::BTreeMap<String, Value>;

// ─── Block ranges ─────────────────────────────────────────────────────────────

/// Half-open block interval `(from, to]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRange {
    /// Last block known to be good (excluded).
    pub from: i64,
    /// Highest block to repair (included).
    pub to: i64,
}

impl BlockRange {
    pub fn new(from: i64, to: i64) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, block_number: i64) -> bool {
        block_number > self.from && block_number <= self.to
    }

    pub fn is_empty(&self) -> bool {
        self.to <= self.from
    }
}

impl std::fmt::Display for BlockRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}]", self.from, self.to)
    }
}

// ─── Time windows ─────────────────────────────────────────────────────────────

/// Optional inclusive bounds on `create_time`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl TimeWindow {
    pub fn new(start: Option<i64>, end: Option<i64>) -> Self {
        Self { start, end }
    }

    /// Predicates for this window; empty when neither bound is set.
    pub fn predicates(&self) -> Vec<Predicate> {
        let ge = |v: i64| Predicate {
            column: col::CREATE_TIME.to_string(),
            op: CmpOp::Ge,
            value: Value::Int(v),
        };
        let le = |v: i64| Predicate {
            column: col::CREATE_TIME.to_string(),
            op: CmpOp::Le,
            value: Value::Int(v),
        };
        match (self.start, self.end) {
            (None, None) => vec![],
            (Some(start), None) => vec![ge(start)],
            (None, Some(end)) => vec![le(end)],
            (Some(start), Some(end)) => vec![ge(start), le(end)],
        }
    }
}

// ─── Ordering and selection ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Order {
    /// Primary key ascending.
    #[default]
    IdAsc,
    /// Primary key descending.
    IdDesc,
    /// Newest first; primary key descending breaks ties.
    CreateTimeDesc,
}

/// A filtered, ordered and optionally bounded read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub filter: Filter,
    pub order: Order,
    pub limit: Option<u64>,
    pub offset: u64,
}

impl Selection {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }
}

// ─── Results ──────────────────────────────────────────────────────────────────

/// One page of records plus the total match count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult<T> {
    pub data: Vec<T>,
    pub page_index: u64,
    pub page_size: u64,
    pub total: u64,
}

/// Optional equality filters for recent-activity queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecentFilter {
    pub market: Option<String>,
    pub owner: Option<String>,
    pub window: TimeWindow,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(block: i64, time: i64, fork: bool) -> Row {
        Row::new()
            .with(col::BLOCK_NUMBER, block)
            .with(col::CREATE_TIME, time)
            .with(col::FORK, fork)
            .with(col::MARKET, "LRC-WETH")
    }

    #[test]
    fn time_window_has_four_distinct_shapes() {
        assert!(TimeWindow::new(None, None).predicates().is_empty());

        let start = TimeWindow::new(Some(10), None).predicates();
        assert_eq!(start.len(), 1);
        assert_eq!(start[0].op, CmpOp::Ge);

        let end = TimeWindow::new(None, Some(20)).predicates();
        assert_eq!(end.len(), 1);
        assert_eq!(end[0].op, CmpOp::Le);

        let both = TimeWindow::new(Some(10), Some(20)).predicates();
        assert_eq!(both.len(), 2);
    }

    #[test]
    fn start_only_window_has_no_upper_bound() {
        let f = Filter::new().time_window(TimeWindow::new(Some(100), None));
        assert!(!f.matches(1, &row(1, 99, false)));
        assert!(f.matches(1, &row(1, 100, false)));
        assert!(f.matches(1, &row(1, i64::MAX, false)));
    }

    #[test]
    fn end_only_window_has_no_lower_bound() {
        let f = Filter::new().time_window(TimeWindow::new(None, Some(100)));
        assert!(f.matches(1, &row(1, i64::MIN, false)));
        assert!(f.matches(1, &row(1, 100, false)));
        assert!(!f.matches(1, &row(1, 101, false)));
    }

    #[test]
    fn empty_window_adds_nothing_to_other_filters() {
        let f = Filter::new()
            .eq(col::MARKET, "LRC-WETH")
            .time_window(TimeWindow::default());
        assert_eq!(f.predicates().len(), 1);
        assert!(f.matches(1, &row(1, 0, false)));
    }

    #[test]
    fn block_range_is_open_below_closed_above() {
        let f = Filter::new().block_range(BlockRange::new(90, 100));
        assert!(!f.matches(1, &row(90, 0, false)));
        assert!(f.matches(1, &row(91, 0, false)));
        assert!(f.matches(1, &row(100, 0, false)));
        assert!(!f.matches(1, &row(101, 0, false)));

        let r = BlockRange::new(90, 100);
        assert!(!r.contains(90) && r.contains(100) && !r.contains(101));
    }

    #[test]
    fn not_forked_matches_sqlite_integers() {
        let f = Filter::new().not_forked();
        assert!(f.matches(1, &Row::new().with(col::FORK, 0i64)));
        assert!(!f.matches(1, &Row::new().with(col::FORK, 1i64)));
    }

    #[test]
    fn template_ignores_zero_fields() {
        let template = Row::new()
            .with(col::MARKET, "LRC-WETH")
            .with(col::BLOCK_NUMBER, 0i64)
            .with(col::FORK, false);
        let f = Filter::from_template(&template);
        // id > 0 plus market
        assert_eq!(f.predicates().len(), 2);
        assert!(f.matches(5, &row(7, 0, true)));
        assert!(!f.matches(0, &row(7, 0, true)));
    }

    #[test]
    fn mismatched_types_never_match() {
        assert!(!CmpOp::Eq.eval(&Value::Text("1".into()), &Value::Int(1)));
    }

    #[test]
    fn page_result_json_shape() {
        let page = PageResult {
            data: vec![1, 2],
            page_index: 1,
            page_size: 2,
            total: 5,
        };
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["pageIndex"], 1);
        assert_eq!(json["pageSize"], 2);
        assert_eq!(json["total"], 5);
    }
}
