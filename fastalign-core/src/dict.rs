use hashbrown::HashMap;

use crate::types::{Token, NULL_TOKEN, NULL_WORD};

/// Maps surface strings to small stable ids and back.
pub trait Interner {
    /// Returns the id of `word`, assigning the next free id on first sight.
    fn intern(&mut self, word: &str) -> Token;
    fn lookup(&self, id: Token) -> Option<&str>;
    /// Number of ids handed out, including the reserved null word.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug)]
pub struct Dict {
    ids: HashMap<String, Token>,
    words: Vec<String>,
}

impl Default for Dict {
    fn default() -> Self {
        Self::new()
    }
}

impl Dict {
    pub fn new() -> Self {
        let mut ids = HashMap::new();
        ids.insert(NULL_WORD.to_string(), NULL_TOKEN);
        Dict { ids, words: vec![NULL_WORD.to_string()] }
    }

    /// Largest id handed out to a real word (0 when only the null word exists).
    pub fn max(&self) -> Token {
        (self.words.len() - 1) as Token
    }

    pub fn get(&self, word: &str) -> Option<Token> {
        self.ids.get(word).copied()
    }

    pub fn convert_line(&mut self, line: &str) -> Vec<Token> {
        line.split_whitespace().map(|w| self.intern(w)).collect()
    }
}

impl Interner for Dict {
    fn intern(&mut self, word: &str) -> Token {
        if let Some(&id) = self.ids.get(word) {
            return id;
        }
        let id = self.words.len() as Token;
        self.words.push(word.to_string());
        self.ids.insert(word.to_string(), id);
        id
    }

    fn lookup(&self, id: Token) -> Option<&str> {
        self.words.get(id as usize).map(String::as_str)
    }

    fn len(&self) -> usize {
        self.words.len()
    }
}
