//! Genotype call decomposition and zygosity classification.

use std::collections::BTreeMap;
use std::str::FromStr;

use itertools::Itertools;

use crate::error::{Result, VcfError};
use crate::parser;
use crate::types::MISSING_VALUE;

const PHASED: char = '|';
const UNPHASED: char = '/';

/// One allele of a genotype call: an index into the record's alleles, or the null allele `.`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GenotypeAllele {
    Called(u32),
    Null,
}

impl GenotypeAllele {
    /// Get the index into the list of alleles.
    pub fn index(self) -> Option<u32> {
        match self {
            GenotypeAllele::Called(i) => Some(i),
            GenotypeAllele::Null => None,
        }
    }
}

impl FromStr for GenotypeAllele {
    type Err = VcfError;

    fn from_str(s: &str) -> Result<Self> {
        if s == MISSING_VALUE {
            Ok(GenotypeAllele::Null)
        } else {
            parser::allele_index(s)
                .map(GenotypeAllele::Called)
                .ok_or_else(|| VcfError::MalformedGenotype(s.into()))
        }
    }
}

/// A genotype call reduced to the multiset of its alleles, phasing dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Genotype {
    alleles: BTreeMap<GenotypeAllele, usize>,
}

/// Decomposes e.g. `0/1` or `1|.` into allele counts.
pub fn decompose(genotype: &str) -> Result<Genotype> {
    let mut alleles = BTreeMap::new();
    for allele in genotype.split(|c: char| c == PHASED || c == UNPHASED) {
        let allele = allele
            .parse::<GenotypeAllele>()
            .map_err(|_| VcfError::MalformedGenotype(genotype.into()))?;
        *alleles.entry(allele).or_insert(0) += 1;
    }
    Ok(Genotype { alleles })
}

impl FromStr for Genotype {
    type Err = VcfError;

    fn from_str(s: &str) -> Result<Self> {
        decompose(s)
    }
}

impl Genotype {
    /// How often `allele` occurs in the call.
    pub fn count(&self, allele: GenotypeAllele) -> usize {
        self.alleles.get(&allele).copied().unwrap_or(0)
    }

    pub fn ploidy(&self) -> usize {
        self.alleles.values().sum()
    }

    pub fn alleles(&self) -> impl Iterator<Item = (GenotypeAllele, usize)> + '_ {
        self.alleles.iter().map(|(&a, &n)| (a, n))
    }

    pub fn is_het(&self) -> bool {
        self.alleles.len() > 1
    }

    pub fn is_hom(&self) -> bool {
        self.alleles.len() == 1
    }

    pub fn has_non_ref(&self) -> bool {
        self.alleles.keys().any(|a| match a {
            GenotypeAllele::Called(i) => *i != 0,
            GenotypeAllele::Null => false,
        })
    }

    pub fn is_hom_ref(&self) -> bool {
        self.is_hom() && self.alleles.contains_key(&GenotypeAllele::Called(0))
    }

    pub fn is_hom_non_ref(&self) -> bool {
        self.is_hom() && self.has_non_ref()
    }

    /// True for partially as well as fully missing calls.
    pub fn is_null(&self) -> bool {
        self.alleles.contains_key(&GenotypeAllele::Null)
    }
}

/// The all-missing call of the same ploidy and phasing, e.g. `0|1` becomes `.|.`.
pub fn missing_genotype(genotype: &str) -> String {
    genotype
        .split_inclusive(|c: char| c == PHASED || c == UNPHASED)
        .map(|allele| match allele.chars().last() {
            Some(sep) if sep == PHASED || sep == UNPHASED => format!("{}{}", MISSING_VALUE, sep),
            _ => MISSING_VALUE.to_owned(),
        })
        .join("")
}

/// Ordinal of the unordered diploid genotype `j/k` among all genotypes of a locus:
/// `k * (k + 1) / 2 + j` with `j <= k`.
pub fn genotype_ordinal(j: usize, k: usize) -> usize {
    let (j, k) = if j <= k { (j, k) } else { (k, j) };
    k * (k + 1) / 2 + j
}

/// Number of distinct unordered genotypes for `n_alleles` alleles at the given ploidy,
/// `None` if it does not fit into a `usize`.
pub fn genotype_count(n_alleles: usize, ploidy: usize) -> Option<usize> {
    // C(n + p - 1, p)
    (1..=ploidy).try_fold(1usize, |acc, i| {
        acc.checked_mul(n_alleles.checked_add(i - 1)?)
            .map(|product| product / i)
    })
}
