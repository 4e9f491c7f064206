use fastalign_core::{AlignOptions, Aligner, Corpus};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct AlignOutput {
    links_moses: String,
    table: Option<String>,
    tension: f64,
}

#[wasm_bindgen]
impl AlignOutput {
    #[wasm_bindgen(getter)]
    pub fn links_moses(&self) -> String {
        self.links_moses.clone()
    }
    #[wasm_bindgen(getter)]
    pub fn table(&self) -> Option<String> {
        self.table.clone()
    }
    #[wasm_bindgen(getter)]
    pub fn tension(&self) -> f64 {
        self.tension
    }
}

fn run(corpus: &str, opts: AlignOptions, want_table: bool) -> Result<AlignOutput, String> {
    let mut aligner = Aligner::new(opts).map_err(|e| e.to_string())?;
    let res = aligner.train(&Corpus::Text(corpus)).map_err(|e| e.to_string())?;
    let table = if want_table {
        let mut buf = Vec::new();
        aligner
            .ttable()
            .export_to_writer(&mut buf, aligner.dict())
            .map_err(|e| e.to_string())?;
        Some(String::from_utf8(buf).map_err(|e| e.to_string())?)
    } else {
        None
    };
    Ok(AlignOutput {
        links_moses: res.to_moses(),
        table,
        tension: res.tension,
    })
}

#[wasm_bindgen]
pub fn align_corpus(
    corpus: &str,
    iterations: usize,
    favor_diagonal: bool,
    optimize_tension: bool,
    variational_bayes: bool,
    alpha: f64,
    prob_align_null: f64,
    no_null_word: bool,
    diagonal_tension: f64,
    reverse: bool,
    want_table: bool,
) -> Result<AlignOutput, JsValue> {
    let opts = AlignOptions {
        iterations,
        favor_diagonal,
        optimize_tension,
        variational_bayes,
        alpha,
        prob_align_null,
        no_null_word,
        diagonal_tension,
        reverse,
    };
    run(corpus, opts, want_table).map_err(|e| JsValue::from_str(&e))
}

/// Same as [`align_corpus`] with options given as a TOML document.
#[wasm_bindgen]
pub fn align_corpus_with_config(corpus: &str, config: &str, want_table: bool) -> Result<AlignOutput, JsValue> {
    let opts = AlignOptions::from_toml_str(config).map_err(|e| JsValue::from_str(&e.to_string()))?;
    run(corpus, opts, want_table).map_err(|e| JsValue::from_str(&e))
}
