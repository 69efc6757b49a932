//! Word-embedding lookup capability.
//!
//! A read-only word → vector map in the GloVe text format (`word v1 v2 …`,
//! one entry per line). The lookup is constructed once per run by the
//! orchestrator — there is no global model state — and shared read-only by
//! all segmentation workers. When no local copy exists, the configured model
//! URL is fetched once into `~/.folio/models/` (temp file + rename, sha256
//! logged) and reused by later runs.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use folio_shared::{EmbeddingConfig, FolioError, Result, model_cache_dir};

/// Timeout for the one-off model download.
const FETCH_TIMEOUT_SECS: u64 = 600;

/// User-Agent string for model fetch requests.
const USER_AGENT: &str = concat!("folio/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// EmbeddingLookup
// ---------------------------------------------------------------------------

/// Read-only mapping from word to embedding vector.
#[derive(Debug)]
pub struct EmbeddingLookup {
    dim: usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl EmbeddingLookup {
    /// Parse a GloVe-format vectors stream.
    ///
    /// An optional word2vec-style header line (`<count> <dim>`) is skipped.
    /// Dimensionality is pinned by the first vector line; any later line
    /// that disagrees is a validation error.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let reader = BufReader::new(reader);
        let mut vectors: HashMap<String, Vec<f32>> = HashMap::new();
        let mut dim: Option<usize> = None;

        for (line_no, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| FolioError::io("<embedding stream>", e))?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let mut parts = line.split_ascii_whitespace();
            let word = match parts.next() {
                Some(w) => w,
                None => continue,
            };
            let values: Vec<f32> = parts.map_while(|t| t.parse::<f32>().ok()).collect();

            // word2vec headers are two integers on the first line.
            if line_no == 0 && values.len() == 1 && word.parse::<usize>().is_ok() {
                debug!("skipping word2vec header line");
                continue;
            }

            if values.is_empty() {
                warn!(line = line_no + 1, "skipping vector line with no values");
                continue;
            }

            match dim {
                None => dim = Some(values.len()),
                Some(d) if d != values.len() => {
                    return Err(FolioError::validation(format!(
                        "inconsistent embedding dimension at line {}: expected {d}, got {}",
                        line_no + 1,
                        values.len()
                    )));
                }
                Some(_) => {}
            }

            vectors.insert(word.to_lowercase(), values);
        }

        let dim = dim.ok_or_else(|| {
            FolioError::validation("embedding source contained no vectors")
        })?;

        info!(words = vectors.len(), dim, "embedding lookup loaded");
        Ok(Self { dim, vectors })
    }

    /// Load a vectors file from disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| FolioError::io(path, e))?;
        Self::from_reader(file)
    }

    /// Vector dimensionality.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of words in the vocabulary.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Look up a word (case-insensitive).
    pub fn lookup(&self, word: &str) -> Option<&[f32]> {
        if let Some(v) = self.vectors.get(word) {
            return Some(v.as_slice());
        }
        self.vectors.get(&word.to_lowercase()).map(Vec::as_slice)
    }

    /// Fraction of the given tokens present in the vocabulary.
    pub fn coverage<'a, I>(&self, tokens: I) -> f32
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut total = 0usize;
        let mut hits = 0usize;
        for token in tokens {
            total += 1;
            if self.lookup(token).is_some() {
                hits += 1;
            }
        }
        if total == 0 {
            0.0
        } else {
            hits as f32 / total as f32
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution (local path → cache → fetch)
// ---------------------------------------------------------------------------

/// Resolve the embedding capability for a run.
///
/// Precedence: explicit `model_path`, then the cached copy under the model
/// cache directory, then a one-off fetch of `model_url`. When none of these
/// can produce a vectors file the run-level [`FolioError::EmbeddingUnavailable`]
/// is returned — distinct from low vocabulary coverage, which only degrades
/// segmentation quality.
#[instrument(skip_all, fields(model = %config.model_name))]
pub async fn resolve(config: &EmbeddingConfig) -> Result<EmbeddingLookup> {
    if let Some(path) = &config.model_path {
        info!(path = %path.display(), "loading embedding model from explicit path");
        return EmbeddingLookup::from_path(path);
    }

    let cache_path = cache_file_path(config)?;
    if cache_path.exists() {
        info!(path = %cache_path.display(), "loading embedding model from cache");
        return EmbeddingLookup::from_path(&cache_path);
    }

    let Some(url) = &config.model_url else {
        return Err(FolioError::EmbeddingUnavailable(format!(
            "no local model at {} and no model_url configured",
            cache_path.display()
        )));
    };

    fetch_model(url, &cache_path).await?;
    EmbeddingLookup::from_path(&cache_path)
}

/// Cache location for the configured model.
fn cache_file_path(config: &EmbeddingConfig) -> Result<PathBuf> {
    let dir = match &config.cache_dir {
        Some(dir) => dir.clone(),
        None => model_cache_dir()?,
    };
    Ok(dir.join(format!("{}.txt", config.model_name)))
}

/// Download the vectors file to the cache, atomically.
async fn fetch_model(url: &str, dest: &Path) -> Result<()> {
    let url = url::Url::parse(url)
        .map_err(|e| FolioError::EmbeddingUnavailable(format!("invalid model_url '{url}': {e}")))?;

    info!(url = %url, dest = %dest.display(), "fetching embedding model");

    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(std::time::Duration::from_secs(FETCH_TIMEOUT_SECS))
        .build()
        .map_err(|e| FolioError::EmbeddingUnavailable(format!("client build: {e}")))?;

    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| FolioError::EmbeddingUnavailable(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FolioError::EmbeddingUnavailable(format!(
            "{url}: HTTP {status}"
        )));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| FolioError::EmbeddingUnavailable(format!("{url}: {e}")))?;

    let sha256 = {
        let mut hasher = Sha256::new();
        hasher.update(&body);
        format!("{:x}", hasher.finalize())
    };

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| FolioError::io(parent, e))?;
    }

    // Write to a temp file first so a failed download never poisons the cache.
    let file_name = dest
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "model".into());
    let temp = dest.with_file_name(format!(".{file_name}.tmp"));
    std::fs::write(&temp, &body).map_err(|e| FolioError::io(&temp, e))?;
    std::fs::rename(&temp, dest).map_err(|e| FolioError::io(dest, e))?;

    info!(bytes = body.len(), %sha256, "embedding model cached");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_MODEL: &str = "\
king 0.5 0.1 0.3
queen 0.4 0.2 0.3
bread 0.9 0.8 0.1
";

    #[test]
    fn parses_glove_format() {
        let lookup = EmbeddingLookup::from_reader(SMALL_MODEL.as_bytes()).unwrap();
        assert_eq!(lookup.dim(), 3);
        assert_eq!(lookup.len(), 3);
        assert_eq!(lookup.lookup("king"), Some(&[0.5, 0.1, 0.3][..]));
        assert!(lookup.lookup("castle").is_none());
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let lookup = EmbeddingLookup::from_reader(SMALL_MODEL.as_bytes()).unwrap();
        assert!(lookup.lookup("King").is_some());
        assert!(lookup.lookup("QUEEN").is_some());
    }

    #[test]
    fn skips_word2vec_header() {
        let input = "3 2\nking 0.5 0.1\nqueen 0.4 0.2\n";
        let lookup = EmbeddingLookup::from_reader(input.as_bytes()).unwrap();
        assert_eq!(lookup.dim(), 2);
        assert_eq!(lookup.len(), 2);
    }

    #[test]
    fn inconsistent_dim_is_an_error() {
        let input = "king 0.5 0.1\nqueen 0.4 0.2 0.9\n";
        let err = EmbeddingLookup::from_reader(input.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("dimension"));
    }

    #[test]
    fn empty_source_is_an_error() {
        let err = EmbeddingLookup::from_reader("".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("no vectors"));
    }

    #[test]
    fn coverage_fraction() {
        let lookup = EmbeddingLookup::from_reader(SMALL_MODEL.as_bytes()).unwrap();
        let coverage = lookup.coverage(["king", "bread", "dragon", "castle"]);
        assert!((coverage - 0.5).abs() < f32::EPSILON);
        assert_eq!(lookup.coverage(std::iter::empty::<&str>()), 0.0);
    }

    fn temp_cache_dir() -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("folio-embedding-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn resolve_prefers_explicit_path() {
        let tmp = temp_cache_dir();
        let model_path = tmp.join("local.txt");
        std::fs::write(&model_path, SMALL_MODEL).unwrap();

        let config = EmbeddingConfig {
            model_path: Some(model_path),
            cache_dir: Some(tmp.clone()),
            ..Default::default()
        };
        let lookup = resolve(&config).await.unwrap();
        assert_eq!(lookup.len(), 3);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn resolve_without_any_source_is_unavailable() {
        let tmp = temp_cache_dir();
        let config = EmbeddingConfig {
            cache_dir: Some(tmp.clone()),
            model_url: None,
            ..Default::default()
        };
        let err = resolve(&config).await.unwrap_err();
        assert!(matches!(err, FolioError::EmbeddingUnavailable(_)));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn resolve_fetches_and_caches_model() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/glove.txt"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(SMALL_MODEL))
            .mount(&server)
            .await;

        let tmp = temp_cache_dir();
        let config = EmbeddingConfig {
            model_name: "test-model".into(),
            model_url: Some(format!("{}/glove.txt", server.uri())),
            cache_dir: Some(tmp.clone()),
            ..Default::default()
        };

        let lookup = resolve(&config).await.unwrap();
        assert_eq!(lookup.len(), 3);

        // Cached for the next run; no temp files left behind.
        assert!(tmp.join("test-model.txt").exists());
        for entry in std::fs::read_dir(&tmp).unwrap() {
            let name = entry.unwrap().file_name().to_string_lossy().to_string();
            assert!(!name.ends_with(".tmp"), "temp file left behind: {name}");
        }

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn resolve_fetch_failure_is_unavailable() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/glove.txt"))
            .respond_with(wiremock::ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let tmp = temp_cache_dir();
        let config = EmbeddingConfig {
            model_name: "test-model".into(),
            model_url: Some(format!("{}/glove.txt", server.uri())),
            cache_dir: Some(tmp.clone()),
            ..Default::default()
        };

        let err = resolve(&config).await.unwrap_err();
        assert!(matches!(err, FolioError::EmbeddingUnavailable(_)));
        assert!(!tmp.join("test-model.txt").exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
