use std::hash::{Hash, Hasher};

use bigdecimal::BigDecimal;

/// One end of a numeric range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberBound {
    pub value: BigDecimal,
    pub inclusive: bool,
}

/// Equal values with different scales hash alike.
impl Hash for NumberBound {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.normalized().hash(state);
        self.inclusive.hash(state);
    }
}

impl NumberBound {
    pub fn new(value: BigDecimal, inclusive: bool) -> Self {
        NumberBound { value, inclusive }
    }

    pub fn inclusive(value: BigDecimal) -> Self {
        NumberBound::new(value, true)
    }

    pub fn exclusive(value: BigDecimal) -> Self {
        NumberBound::new(value, false)
    }
}

/// Partial knowledge about an unknown value. `None` means unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Refinement {
    pub is_known_null: Option<bool>,
    pub string_prefix: Option<String>,
    pub number_lower_bound: Option<NumberBound>,
    pub number_upper_bound: Option<NumberBound>,
    pub collection_length_lower_bound: Option<u64>,
    pub collection_length_upper_bound: Option<u64>,
}

impl Refinement {
    pub fn new() -> Self {
        Refinement::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Refinement::default()
    }

    pub fn not_null(mut self) -> Self {
        self.is_known_null = Some(false);
        self
    }

    pub fn with_string_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.string_prefix = Some(prefix.into());
        self
    }

    pub fn with_number_lower_bound(mut self, value: BigDecimal, inclusive: bool) -> Self {
        self.number_lower_bound = Some(NumberBound::new(value, inclusive));
        self
    }

    pub fn with_number_upper_bound(mut self, value: BigDecimal, inclusive: bool) -> Self {
        self.number_upper_bound = Some(NumberBound::new(value, inclusive));
        self
    }

    pub fn with_collection_length_lower_bound(mut self, n: u64) -> Self {
        self.collection_length_lower_bound = Some(n);
        self
    }

    pub fn with_collection_length_upper_bound(mut self, n: u64) -> Self {
        self.collection_length_upper_bound = Some(n);
        self
    }

    /// Exact collection length when both bounds agree.
    pub fn exact_length(&self) -> Option<u64> {
        match (
            self.collection_length_lower_bound,
            self.collection_length_upper_bound,
        ) {
            (Some(lo), Some(hi)) if lo == hi => Some(lo),
            _ => None,
        }
    }
}
