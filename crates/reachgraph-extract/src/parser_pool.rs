//! Thread-safe parser pool for tree-sitter parsers.
//!
//! tree-sitter's `Parser` is not `Send`, so a channel-based approach with
//! dedicated worker threads is used to drive it from async call sites.
//! Trimmed to the three grammars this engine supports; the teacher's pool
//! covered nine.

use std::path::PathBuf;

use anyhow::Result;
use tree_sitter::{Language as TsLanguage, Parser};

use reachgraph_core::Language;

/// Tree-sitter grammar to select for a given source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Typescript,
    Go,
    Python,
}

impl FileType {
    /// Determine grammar from file extension. Returns `None` for any
    /// extension outside this engine's three supported languages, so
    /// `FileDiscovery`'s include globs can pick up unrelated files
    /// (README, Cargo.toml, etc.) without the extractor choking on them.
    pub fn from_path(path: &PathBuf) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        match ext {
            "ts" | "tsx" => Some(FileType::Typescript),
            "go" => Some(FileType::Go),
            "py" => Some(FileType::Python),
            _ => None,
        }
    }

    pub fn language_tag(&self) -> Language {
        match self {
            FileType::Typescript => Language::Typescript,
            FileType::Go => Language::Go,
            FileType::Python => Language::Python,
        }
    }

    fn ts_language(&self) -> TsLanguage {
        match self {
            FileType::Typescript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            FileType::Go => tree_sitter_go::LANGUAGE.into(),
            FileType::Python => tree_sitter_python::LANGUAGE.into(),
        }
    }
}

#[derive(Debug)]
pub struct ParseRequest {
    pub file_type: FileType,
    pub content: String,
    pub path: PathBuf,
}

#[derive(Debug)]
pub struct ParseResult {
    pub tree: tree_sitter::Tree,
    pub path: PathBuf,
    pub content: String,
}

#[derive(Debug)]
struct WorkerRequest {
    request: ParseRequest,
    response_sender: std::sync::mpsc::Sender<Result<ParseResult>>,
}

/// Parser pool backed by a fixed number of dedicated worker threads.
pub struct ParserPool {
    sender: std::sync::mpsc::Sender<WorkerRequest>,
}

impl ParserPool {
    pub fn new(num_workers: usize) -> Self {
        let (sender, receiver) = std::sync::mpsc::channel::<WorkerRequest>();
        let receiver = std::sync::Arc::new(std::sync::Mutex::new(receiver));

        for i in 0..num_workers {
            let receiver = receiver.clone();
            std::thread::spawn(move || {
                Self::worker_thread(i, receiver);
            });
        }

        Self { sender }
    }

    fn worker_thread(
        worker_id: usize,
        receiver: std::sync::Arc<std::sync::Mutex<std::sync::mpsc::Receiver<WorkerRequest>>>,
    ) {
        tracing::debug!("parser worker {} started", worker_id);

        let mut parser = Parser::new();

        loop {
            let request = match receiver.lock().unwrap().recv() {
                Ok(req) => req,
                Err(_) => {
                    tracing::debug!("parser worker {} shutting down", worker_id);
                    break;
                }
            };

            let WorkerRequest {
                request,
                response_sender,
            } = request;

            let language = request.file_type.ts_language();
            if let Err(e) = parser.set_language(&language) {
                let _ = response_sender.send(Err(anyhow::anyhow!("failed to set language: {}", e)));
                continue;
            }

            let result = match parser.parse(&request.content, None) {
                Some(tree) => Ok(ParseResult {
                    tree,
                    path: request.path,
                    content: request.content,
                }),
                None => Err(anyhow::anyhow!("failed to parse content")),
            };

            if response_sender.send(result).is_err() {
                tracing::warn!("failed to send parse result back to caller");
            }
        }
    }

    pub fn parse_blocking(&self, request: ParseRequest) -> Result<ParseResult> {
        let (response_sender, response_receiver) = std::sync::mpsc::channel();
        let worker_request = WorkerRequest {
            request,
            response_sender,
        };
        self.sender
            .send(worker_request)
            .map_err(|_| anyhow::anyhow!("parser pool is shut down"))?;
        response_receiver
            .recv()
            .map_err(|_| anyhow::anyhow!("parser worker died"))?
    }

    pub async fn parse(&self, request: ParseRequest) -> Result<ParseResult> {
        let sender = self.sender.clone();
        tokio::task::spawn_blocking(move || {
            let (response_sender, response_receiver) = std::sync::mpsc::channel();
            let worker_request = WorkerRequest {
                request,
                response_sender,
            };
            sender
                .send(worker_request)
                .map_err(|_| anyhow::anyhow!("parser pool is shut down"))?;
            response_receiver
                .recv()
                .map_err(|_| anyhow::anyhow!("parser worker died"))?
        })
        .await
        .map_err(|e| anyhow::anyhow!("task join error: {}", e))?
    }
}

impl Clone for ParserPool {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

/// Worker count defaults to available parallelism, floor 2 — the file-
/// parallel fan-out §5 calls for.
pub fn create_parser_pool() -> ParserPool {
    let num_workers = std::thread::available_parallelism()
        .map(|n| n.get().max(2))
        .unwrap_or(2);
    ParserPool::new(num_workers)
}
