use std::{collections::HashSet, fs, path::Path};

use msgs::WIN_TOKEN;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

use crate::error::GameError;

/// What the coordinator draws rounds from.
pub trait WordSource {
    /// Picks the next word. With `exclude_drawn` set, words already drawn this
    /// session are skipped and `Exhausted` is returned once none remain.
    fn draw(&mut self, exclude_drawn: bool) -> Result<String, GameError>;

    /// Number of distinct words available.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reads a newline-delimited word list.
pub fn load(path: impl AsRef<Path>) -> Result<Vec<String>, GameError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| GameError::ResourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    let words = parse_words(&text);
    debug!(path = %path.display(), words = words.len(), "loaded word list");
    Ok(words)
}

/// Blank lines and repeats are skipped. The reserved terminate token can
/// never be a word because participants could not tell the two apart.
pub fn parse_words(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut words = Vec::new();
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        if line == WIN_TOKEN {
            warn!("dropping reserved token {WIN_TOKEN:?} from the word list");
            continue;
        }
        if seen.insert(line) {
            words.push(line.to_owned());
        }
    }
    words
}

/// Rng used outside of tests: reproducible when seeded, random otherwise.
pub fn session_rng(seed: Option<u64>) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed.unwrap_or_else(rand::random))
}

pub struct WordPool<R> {
    words: Vec<String>,
    drawn: Vec<bool>,
    drawn_count: usize,
    rng: R,
}

impl<R: Rng> WordPool<R> {
    pub fn new(words: Vec<String>, rng: R) -> WordPool<R> {
        let drawn = vec![false; words.len()];
        WordPool {
            words,
            drawn,
            drawn_count: 0,
            rng,
        }
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn drawn_count(&self) -> usize {
        self.drawn_count
    }

    pub fn is_drawn(&self, word: &str) -> bool {
        self.words.iter().zip(&self.drawn).any(|(candidate, drawn)| *drawn && candidate == word)
    }

    pub fn draw(&mut self, exclude_drawn: bool) -> Result<String, GameError> {
        if self.words.is_empty() {
            return Err(GameError::Exhausted);
        }

        let index = if exclude_drawn {
            let remaining = self.words.len() - self.drawn_count;
            if remaining == 0 {
                return Err(GameError::Exhausted);
            }
            let pick = self.rng.gen_range(0..remaining);
            let Some(index) = self.drawn.iter().enumerate().filter(|(_, drawn)| !**drawn).map(|(i, _)| i).nth(pick) else {
                return Err(GameError::Exhausted);
            };
            index
        }
        else {
            self.rng.gen_range(0..self.words.len())
        };

        if !self.drawn[index] {
            self.drawn[index] = true;
            self.drawn_count += 1;
        }
        Ok(self.words[index].clone())
    }

    /// `n` pairwise-distinct words for a grid. Leaves the drawn set alone.
    pub fn sample_distinct(&mut self, n: usize) -> Result<Vec<String>, GameError> {
        if n > self.words.len() {
            return Err(GameError::InsufficientWords {
                needed: n,
                available: self.words.len(),
            });
        }
        let indices = rand::seq::index::sample(&mut self.rng, self.words.len(), n);
        Ok(indices.into_iter().map(|i| self.words[i].clone()).collect())
    }
}

impl<R: Rng> WordSource for WordPool<R> {
    fn draw(&mut self, exclude_drawn: bool) -> Result<String, GameError> {
        WordPool::draw(self, exclude_drawn)
    }

    fn len(&self) -> usize {
        self.words.len()
    }
}
