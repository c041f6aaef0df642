//! ONNX-runtime-backed local text embedder (`local-embeddings` feature).
//!
//! Grounded on the ONNX/tokenizers inference shape: tokenize on the calling
//! thread, run the forward pass in [`tokio::task::spawn_blocking`] since
//! `ort::Session::run` is synchronous, mean-pool the last hidden state, and
//! unit-normalize.

#[cfg(feature = "local-embeddings")]
mod inference {
    use std::path::Path;
    use std::sync::Arc;

    use async_trait::async_trait;
    use ort::execution_providers::CPUExecutionProvider;
    use ort::session::Session;
    use tokenizers::Tokenizer;
    use tokio::sync::Mutex;

    use crate::embeddings::similarity::normalize;
    use crate::embeddings::TextEmbedder;
    use crate::error::{Error, Result};

    /// A local embedding model loaded from a `.onnx` file plus a matching
    /// tokenizer, run entirely on-device.
    pub struct LocalTextEmbedder {
        name: String,
        dimension: usize,
        tokenizer: Tokenizer,
        session: Arc<Mutex<Session>>,
    }

    impl LocalTextEmbedder {
        /// Load a model from `model_path` (`.onnx`) and `tokenizer_path`
        /// (`tokenizer.json`).
        pub fn load(
            name: impl Into<String>,
            dimension: usize,
            model_path: &Path,
            tokenizer_path: &Path,
        ) -> Result<Self> {
            let name = name.into();
            let tokenizer = Tokenizer::from_file(tokenizer_path).map_err(|e| Error::EmbeddingModel {
                model: name.clone(),
                message: format!("failed to load tokenizer: {e}"),
            })?;

            let session = Session::builder()
                .map_err(|e| Error::EmbeddingModel {
                    model: name.clone(),
                    message: format!("failed to build session: {e}"),
                })?
                .with_execution_providers([CPUExecutionProvider::default().build()])
                .map_err(|e| Error::EmbeddingModel {
                    model: name.clone(),
                    message: format!("failed to configure execution provider: {e}"),
                })?
                .commit_from_file(model_path)
                .map_err(|e| Error::EmbeddingModel {
                    model: name.clone(),
                    message: format!("failed to load model: {e}"),
                })?;

            Ok(Self {
                name,
                dimension,
                tokenizer,
                session: Arc::new(Mutex::new(session)),
            })
        }

        async fn infer(&self, text: &str) -> Result<Vec<f32>> {
            let encoding = self.tokenizer.encode(text, false).map_err(|e| Error::Embedding {
                model: self.name.clone(),
                message: format!("failed to tokenize: {e}"),
            })?;

            let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| i64::from(id)).collect();
            let attention_mask: Vec<i64> = encoding
                .get_attention_mask()
                .iter()
                .map(|&m| i64::from(m))
                .collect();

            let session = self.session.clone();
            let model_name = self.name.clone();

            tokio::task::spawn_blocking(move || run_inference(&session, input_ids, attention_mask))
                .await
                .map_err(|e| Error::Embedding {
                    model: model_name,
                    message: format!("inference task panicked: {e}"),
                })?
        }
    }

    fn run_inference(
        session: &Arc<Mutex<Session>>,
        input_ids: Vec<i64>,
        attention_mask: Vec<i64>,
    ) -> Result<Vec<f32>> {
        let input_ids_array = ndarray::Array1::from_vec(input_ids).into_dyn();
        let attention_mask_array = ndarray::Array1::from_vec(attention_mask).into_dyn();

        let wrap = |e: ort::Error| Error::Embedding {
            model: "local".to_string(),
            message: e.to_string(),
        };

        let input_ids_tensor =
            ort::value::TensorRef::from_array_view(input_ids_array.view()).map_err(wrap)?;
        let attention_mask_tensor =
            ort::value::TensorRef::from_array_view(attention_mask_array.view()).map_err(wrap)?;

        let mut session_guard = session.blocking_lock();
        let mut outputs = session_guard
            .run(ort::inputs! {
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
            })
            .map_err(wrap)?;

        let output = outputs
            .remove("last_hidden_state")
            .ok_or_else(|| Error::Embedding {
                model: "local".to_string(),
                message: "model output missing last_hidden_state".to_string(),
            })?;
        let array: ndarray::ArrayViewD<f32> = output.try_extract_array().map_err(wrap)?;

        let shape = array.shape();
        if shape.len() != 3 || shape[0] != 1 {
            return Err(Error::Embedding {
                model: "local".to_string(),
                message: format!("unexpected output shape {shape:?}"),
            });
        }
        let seq_len = shape[1];
        let hidden = shape[2];
        let data = array.as_slice().ok_or_else(|| Error::Embedding {
            model: "local".to_string(),
            message: "output tensor was not contiguous".to_string(),
        })?;

        let mut pooled = vec![0.0f32; hidden];
        for seq_idx in 0..seq_len {
            for (h, slot) in pooled.iter_mut().enumerate() {
                *slot += data[seq_idx * hidden + h];
            }
        }
        for value in &mut pooled {
            *value /= seq_len as f32;
        }

        Ok(normalize(pooled))
    }

    #[async_trait]
    impl TextEmbedder for LocalTextEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.infer(text).await
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn model_name(&self) -> &str {
            &self.name
        }
    }
}

#[cfg(feature = "local-embeddings")]
pub use inference::LocalTextEmbedder;
