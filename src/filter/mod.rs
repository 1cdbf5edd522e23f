//! Filter expressions over records, samples and alleles.
//!
//! A spec such as `DP > 10 & ( AF < 0.5 | DB )` is lexed against a field registry,
//! reordered into postfix form once, and can then be evaluated against any number of
//! records:
//!
//! ```
//! use vcf_filter::{FilterKind, Header, HeaderRef, Variant, VariantFilter};
//!
//! let header: Header = "##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">\n\
//!     #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO"
//!     .parse()
//!     .unwrap();
//! let header = HeaderRef::new(header);
//! let filter = VariantFilter::from_header("DP > 10", FilterKind::Record, &header).unwrap();
//!
//! let record = Variant::from_line(header.clone(), "1\t100\t.\tA\tG\t50\tPASS\tDP=15").unwrap();
//! assert!(filter.passes_record(&record).unwrap());
//! let record = Variant::from_line(header, "1\t100\t.\tA\tG\t50\tPASS\tDP=5").unwrap();
//! assert!(!filter.passes_record(&record).unwrap());
//! ```

mod eval;
mod postfix;
mod token;

use getset::Getters;
use log::debug;
use strum::Display;

pub use eval::Value;
pub use postfix::to_postfix;
pub use token::{tokenize, Operator, RuleToken};

use crate::error::{Result, VcfError};
use crate::record::Variant;
use crate::types::{FieldTypes, Header};
use eval::{evaluate, Context};

/// The context a filter is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum FilterKind {
    /// Evaluated once per record against INFO, QUAL and FILTER.
    Record,
    /// Evaluated per sample (and allele) against FORMAT values.
    Sample,
}

/// A compiled filter. Immutable once built, so it can be shared freely and applied to
/// any number of records.
#[derive(Debug, Clone, Getters)]
#[getset(get = "pub")]
pub struct VariantFilter {
    spec: String,
    /// Operands and operators in postfix order.
    rules: Vec<RuleToken>,
    #[getset(skip)]
    kind: FilterKind,
}

impl VariantFilter {
    /// Compiles `spec`. Fails on unknown identifiers and unbalanced parentheses.
    pub fn new(spec: &str, kind: FilterKind, variables: &FieldTypes) -> Result<Self> {
        let infix = tokenize(spec, variables)?;
        let rules = to_postfix(spec, infix)?;
        debug!("compiled {} filter '{}' into {} rules", kind, spec, rules.len());
        Ok(VariantFilter {
            spec: spec.into(),
            rules,
            kind,
        })
    }

    /// Compiles `spec` against the identifiers `header` declares for `kind`.
    pub fn from_header(spec: &str, kind: FilterKind, header: &Header) -> Result<Self> {
        Self::new(spec, kind, &header.variables(kind))
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    fn expect_kind(&self, kind: FilterKind) -> Result<()> {
        if self.kind == kind {
            Ok(())
        } else {
            Err(VcfError::WrongFilterKind {
                expected: self.kind.to_string(),
            })
        }
    }

    /// Evaluates the filter at an arbitrary context, regardless of its kind.
    pub fn evaluate(
        &self,
        variant: &Variant,
        sample: Option<&str>,
        allele: Option<usize>,
    ) -> Result<bool> {
        evaluate(
            &self.rules,
            Context {
                variant,
                sample,
                allele,
            },
        )
    }

    /// Does the record pass this record filter?
    pub fn passes_record(&self, variant: &Variant) -> Result<bool> {
        self.expect_kind(FilterKind::Record)?;
        self.evaluate(variant, None, None)
    }

    /// Does `sample` pass at every alternate allele? Records without alternate alleles
    /// pass trivially.
    pub fn passes(&self, variant: &Variant, sample: &str) -> Result<bool> {
        self.expect_kind(FilterKind::Sample)?;
        if !variant.has_sample(sample) {
            return Err(VcfError::UnknownSample(sample.into()));
        }
        for allele in 0..variant.alt().len() {
            if !self.evaluate(variant, Some(sample), Some(allele))? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Does `sample` pass at the alternate allele with index `allele` (0 = first ALT)?
    pub fn passes_allele(&self, variant: &Variant, sample: &str, allele: usize) -> Result<bool> {
        self.expect_kind(FilterKind::Sample)?;
        self.evaluate(variant, Some(sample), Some(allele))
    }

    /// See [`Variant::remove_filtered_genotypes`].
    pub fn remove_filtered_genotypes(&self, variant: &mut Variant) -> Result<usize> {
        variant.remove_filtered_genotypes(self)
    }
}
