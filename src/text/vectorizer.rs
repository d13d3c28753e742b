//! Tokenization and TF-IDF features

use crate::error::{Result, XaiError};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Simple text tokenizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextTokenizer {
    lowercase: bool,
    min_token_length: usize,
}

impl TextTokenizer {
    pub fn new() -> Self {
        Self {
            lowercase: true,
            min_token_length: 2,
        }
    }

    pub fn with_lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = lowercase;
        self
    }

    pub fn with_min_length(mut self, len: usize) -> Self {
        self.min_token_length = len;
        self
    }

    /// Alphanumeric runs of at least `min_token_length` characters
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let processed = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        processed
            .split(|c: char| !c.is_alphanumeric())
            .filter(|s| s.chars().count() >= self.min_token_length.max(1))
            .map(|s| s.to_string())
            .collect()
    }
}

impl Default for TextTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

/// TF-IDF vectorizer over an alphabetically sorted vocabulary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    tokenizer: TextTokenizer,
    vocabulary: Vec<String>,
    index: HashMap<String, usize>,
    idf: Option<Array1<f64>>,
    normalize: bool,
    smooth_idf: bool,
}

impl TfidfVectorizer {
    pub fn new() -> Self {
        Self {
            tokenizer: TextTokenizer::new(),
            vocabulary: Vec::new(),
            index: HashMap::new(),
            idf: None,
            normalize: true,
            smooth_idf: true,
        }
    }

    pub fn with_tokenizer(mut self, tokenizer: TextTokenizer) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn fit<S: AsRef<str>>(&mut self, documents: &[S]) -> Result<()> {
        if documents.is_empty() {
            return Err(XaiError::ValidationError(
                "cannot fit a vectorizer on zero documents".to_string(),
            ));
        }

        let tokenized: Vec<Vec<String>> = documents
            .iter()
            .map(|d| self.tokenizer.tokenize(d.as_ref()))
            .collect();
        let terms: BTreeSet<&String> = tokenized.iter().flatten().collect();
        if terms.is_empty() {
            return Err(XaiError::ValidationError(
                "documents contain no tokens".to_string(),
            ));
        }

        self.vocabulary = terms.into_iter().cloned().collect();
        self.index = self
            .vocabulary
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();

        let mut doc_freq = vec![0usize; self.vocabulary.len()];
        for tokens in &tokenized {
            let unique: BTreeSet<usize> = tokens.iter().filter_map(|t| self.index.get(t).copied()).collect();
            for j in unique {
                doc_freq[j] += 1;
            }
        }

        let n_docs = documents.len() as f64;
        let idf = doc_freq
            .iter()
            .map(|&df| {
                let df = df as f64;
                if self.smooth_idf {
                    ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
                } else {
                    (n_docs / df.max(1.0)).ln() + 1.0
                }
            })
            .collect();

        self.idf = Some(idf);
        Ok(())
    }

    /// Raw counts times idf, rows L2-normalized; unknown tokens are ignored
    pub fn transform<S: AsRef<str>>(&self, documents: &[S]) -> Result<Array2<f64>> {
        let idf = self.idf.as_ref().ok_or_else(|| {
            XaiError::ValidationError("Vectorizer not fitted".to_string())
        })?;

        let mut result = Array2::zeros((documents.len(), self.vocabulary.len()));
        for (i, doc) in documents.iter().enumerate() {
            for token in self.tokenizer.tokenize(doc.as_ref()) {
                if let Some(&j) = self.index.get(&token) {
                    result[[i, j]] += 1.0;
                }
            }
        }

        result *= &idf.view().insert_axis(ndarray::Axis(0));

        if self.normalize {
            for mut row in result.rows_mut() {
                let norm = row.dot(&row).sqrt();
                if norm > 0.0 {
                    row /= norm;
                }
            }
        }

        Ok(result)
    }

    pub fn fit_transform<S: AsRef<str>>(&mut self, documents: &[S]) -> Result<Array2<f64>> {
        self.fit(documents)?;
        self.transform(documents)
    }

    pub fn get_feature_names(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn idf(&self) -> Option<&Array1<f64>> {
        self.idf.as_ref()
    }
}

impl Default for TfidfVectorizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenizer() {
        let tokenizer = TextTokenizer::new();
        let tokens = tokenizer.tokenize("I feel mild CHEST-pain, ok?");
        assert_eq!(tokens, vec!["feel", "mild", "chest", "pain", "ok"]);

        let keep_case = TextTokenizer::new().with_lowercase(false).with_min_length(1);
        assert_eq!(keep_case.tokenize("I Am"), vec!["I", "Am"]);
    }

    #[test]
    fn test_vocabulary_sorted() {
        let mut vectorizer = TfidfVectorizer::new();
        vectorizer.fit(&["zebra apple", "mango apple"]).unwrap();
        assert_eq!(vectorizer.get_feature_names(), &["apple", "mango", "zebra"]);
    }

    #[test]
    fn test_smooth_idf_and_norm() {
        let mut vectorizer = TfidfVectorizer::new();
        let x = vectorizer.fit_transform(&["chest pain", "chest"]).unwrap();

        let idf = vectorizer.idf().unwrap();
        assert!((idf[0] - 1.0).abs() < 1e-12); // "chest" in every document
        assert!((idf[1] - ((3.0f64 / 2.0).ln() + 1.0)).abs() < 1e-12);

        for row in x.rows() {
            assert!((row.dot(&row) - 1.0).abs() < 1e-12);
        }
        assert_eq!(x[[1, 1]], 0.0);
    }

    #[test]
    fn test_unknown_tokens_ignored() {
        let mut vectorizer = TfidfVectorizer::new();
        vectorizer.fit(&["severe chest pain"]).unwrap();
        let x = vectorizer.transform(&["xyzzy plugh"]).unwrap();
        assert!(x.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_custom_tokenizer_without_norm() {
        let mut vectorizer = TfidfVectorizer::new()
            .with_tokenizer(TextTokenizer::new().with_min_length(1))
            .with_normalize(false);
        let x = vectorizer.fit_transform(&["a pain", "pain pain"]).unwrap();

        assert_eq!(vectorizer.get_feature_names(), &["a", "pain"]);
        // Raw count times idf; "pain" is in both documents so idf = 1
        assert!((x[[1, 1]] - 2.0).abs() < 1e-12);
        assert!((x[[0, 0]] - ((3.0f64 / 2.0).ln() + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_not_fitted() {
        let vectorizer = TfidfVectorizer::new();
        assert!(vectorizer.transform(&["text"]).is_err());
    }
}
