use std::collections::{BTreeSet, HashMap};

use crate::error::{RagError, Result};

/// Minimum token length kept by [`tokenize`].
const MIN_TOKEN_CHARS: usize = 2;

/// Bag-of-words TF-IDF model with smoothed IDF and L2-normalized output.
///
/// Vocabulary columns are sorted lexicographically so that two fits over the
/// same corpus always produce the same column layout.
#[derive(Debug, Clone, Default)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f32>,
    fitted: bool,
}

impl TfidfVectorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn vocabulary and IDF weights from `texts`, replacing any previous fit.
    pub fn fit<S: AsRef<str>>(&mut self, texts: &[S]) {
        let n_docs = texts.len();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for text in texts {
            let unique: BTreeSet<String> = tokenize(text.as_ref()).collect();
            for term in unique {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let mut terms: Vec<(String, usize)> = doc_freq.into_iter().collect();
        terms.sort_by(|a, b| a.0.cmp(&b.0));

        self.vocabulary = HashMap::with_capacity(terms.len());
        self.idf = Vec::with_capacity(terms.len());
        for (col, (term, df)) in terms.into_iter().enumerate() {
            self.idf.push(smoothed_idf(n_docs, df));
            self.vocabulary.insert(term, col);
        }
        self.fitted = true;
    }

    /// Project one text into the fitted space.
    pub fn transform(&self, text: &str) -> Result<Vec<f32>> {
        if !self.fitted {
            return Err(RagError::DegenerateInput(
                "vectorizer has not been fitted".to_string(),
            ));
        }

        let mut row = vec![0.0f32; self.idf.len()];
        for token in tokenize(text) {
            if let Some(&col) = self.vocabulary.get(&token) {
                row[col] += 1.0;
            }
        }

        for (value, idf) in row.iter_mut().zip(&self.idf) {
            *value *= idf;
        }
        l2_normalize(&mut row);
        Ok(row)
    }

    /// Fit on `texts` and return one row per text.
    pub fn fit_transform<S: AsRef<str>>(&mut self, texts: &[S]) -> Result<Vec<Vec<f32>>> {
        self.fit(texts);
        texts.iter().map(|t| self.transform(t.as_ref())).collect()
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    pub fn vocabulary_size(&self) -> usize {
        self.idf.len()
    }

    /// Column index of `term`, if it is in the vocabulary.
    pub fn column(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    pub fn idf(&self, term: &str) -> Option<f32> {
        self.column(term).map(|col| self.idf[col])
    }
}

/// Lowercased runs of word characters, at least two characters long.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
        .map(|t| t.to_lowercase())
}

fn smoothed_idf(n_docs: usize, doc_freq: usize) -> f32 {
    (((1 + n_docs) as f32) / ((1 + doc_freq) as f32)).ln() + 1.0
}

fn l2_normalize(row: &mut [f32]) {
    let norm = row.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in row.iter_mut() {
            *v /= norm;
        }
    }
}
