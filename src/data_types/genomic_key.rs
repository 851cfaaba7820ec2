use serde::Serialize;

/// Converts a chromosome label into the canonical form shared by every key in the crate.
/// A leading "chr" (any case) is removed and the mitochondrial contig is always "MT".
/// # Arguments
/// * `chrom` - the chromosome label as written in the input
pub fn canonical_chrom(chrom: &str) -> String {
    let trimmed = chrom.trim();
    let stripped = match trimmed.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("chr") && trimmed.len() > 3 => &trimmed[3..],
        _ => trimmed
    };

    if stripped == "M" {
        "MT".to_string()
    } else {
        stripped.to_string()
    }
}

/// The join key between caller records and annotated variants.
/// Can only be built through `GenomicKey::new`, which guarantees the chromosome is canonical.
#[derive(Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize)]
pub struct GenomicKey {
    /// Canonical chromosome label
    chrom: String,
    /// 0-based start coordinate
    start: u64,
    /// 0-based exclusive end coordinate
    end: u64,
    /// Reference allele
    ref_allele: String,
    /// First alternate allele
    alt_allele: String
}

impl GenomicKey {
    /// Constructor, the chromosome is canonicalized here
    /// # Arguments
    /// * `chrom` - chromosome label, with or without a "chr" prefix
    /// * `start` - 0-based start
    /// * `end` - 0-based exclusive end
    /// * `ref_allele` - the REF sequence
    /// * `alt_allele` - the first ALT sequence
    pub fn new(chrom: &str, start: u64, end: u64, ref_allele: &str, alt_allele: &str) -> Self {
        Self {
            chrom: canonical_chrom(chrom),
            start,
            end,
            ref_allele: ref_allele.to_string(),
            alt_allele: alt_allele.to_string()
        }
    }

    /// Builds a key from a 1-based VCF position, end is derived from the REF length
    /// # Arguments
    /// * `chrom` - chromosome label
    /// * `position` - 1-based POS column
    /// * `ref_allele` - the REF sequence
    /// * `alt_allele` - the first ALT sequence
    pub fn from_vcf_position(chrom: &str, position: usize, ref_allele: &str, alt_allele: &str) -> Self {
        let start = position.saturating_sub(1) as u64;
        let end = start + ref_allele.len() as u64;
        Self::new(chrom, start, end, ref_allele, alt_allele)
    }

    // getters
    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn ref_allele(&self) -> &str {
        &self.ref_allele
    }

    pub fn alt_allele(&self) -> &str {
        &self.alt_allele
    }
}

impl std::fmt::Display for GenomicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}-{} {}>{}", self.chrom, self.start, self.end, self.ref_allele, self.alt_allele)
    }
}
