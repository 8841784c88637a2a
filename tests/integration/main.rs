//! End-to-end tests exercising the whole pipeline — discovery, extraction,
//! reachability, and the artifact codec — against small on-disk fixture
//! projects, plus the server/watcher plumbing that wraps it.

use std::fs;

use reachgraph_core::{codec, EntryPointRule, Language, ResolvedConfig};
use tempfile::TempDir;

fn write_project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, contents) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }
    dir
}

#[tokio::test]
async fn typescript_project_yields_live_and_dead_functions() {
    let project = write_project(&[(
        "src/index.ts",
        r#"
export function main() {
    helper();
}

function helper() {
    return 1;
}

function unused() {
    return 2;
}
"#,
    )]);

    let mut config = ResolvedConfig::new(Language::Typescript, project.path().to_string_lossy());
    config.entry_points = vec![EntryPointRule::Function { name: "main".to_string() }];

    let graph = reachgraph_extract::run_pipeline(&config).await.unwrap();

    assert_eq!(graph.metadata.total_files, 1);
    let main = graph.nodes.iter().find(|n| n.name == "main").unwrap();
    assert_eq!(main.status, reachgraph_core::Status::Entry);
    let helper = graph.nodes.iter().find(|n| n.name == "helper").unwrap();
    assert_eq!(helper.status, reachgraph_core::Status::Live);
    let unused = graph.nodes.iter().find(|n| n.name == "unused").unwrap();
    assert_eq!(unused.status, reachgraph_core::Status::Dead);
}

#[tokio::test]
async fn python_main_guard_marks_referenced_functions_as_entries() {
    let project = write_project(&[(
        "app.py",
        r#"
def run():
    pass


def dead():
    pass


if __name__ == "__main__":
    run()
"#,
    )]);

    let config = ResolvedConfig::new(Language::Python, project.path().to_string_lossy());
    let graph = reachgraph_extract::run_pipeline(&config).await.unwrap();

    let run = graph.nodes.iter().find(|n| n.name == "run").unwrap();
    assert!(run.is_entry_point);
    let dead = graph.nodes.iter().find(|n| n.name == "dead").unwrap();
    assert_eq!(dead.status, reachgraph_core::Status::Dead);
}

#[tokio::test]
async fn go_auto_detects_main_as_an_entry_point() {
    let project = write_project(&[(
        "main.go",
        r#"
package main

func helper() int {
	return 1
}

func main() {
	helper()
}
"#,
    )]);

    let config = ResolvedConfig::new(Language::Go, project.path().to_string_lossy());
    let graph = reachgraph_extract::run_pipeline(&config).await.unwrap();

    let main = graph.nodes.iter().find(|n| n.name == "main").unwrap();
    assert!(main.is_entry_point);
}

#[tokio::test]
async fn empty_project_produces_an_empty_non_error_artifact() {
    let project = TempDir::new().unwrap();
    let config = ResolvedConfig::new(Language::Typescript, project.path().to_string_lossy());
    let graph = reachgraph_extract::run_pipeline(&config).await.unwrap();

    assert!(graph.nodes.is_empty());
    assert_eq!(graph.metadata.total_files, 0);
}

#[tokio::test]
async fn artifact_round_trips_through_the_codec() {
    let project = write_project(&[("src/index.ts", "export function main() {}\n")]);
    let config = ResolvedConfig::new(Language::Typescript, project.path().to_string_lossy());
    let graph = reachgraph_extract::run_pipeline(&config).await.unwrap();

    let json = codec::encode(&graph).unwrap();
    let decoded = codec::decode(&json).unwrap();
    assert_eq!(decoded, graph);
}

#[tokio::test]
async fn watcher_broadcasts_a_graph_update_envelope() {
    let project = write_project(&[("src/index.ts", "export function main() {}\n")]);
    let config = ResolvedConfig::new(Language::Typescript, project.path().to_string_lossy());

    let (watcher, mut updates) = reachgraph_watch::WatcherService::new(config);
    watcher.run_once().await;

    let message = updates.try_recv().unwrap();
    assert!(message.contains("\"type\":\"graph-update\""));
}

#[tokio::test]
async fn server_router_serves_the_last_assembled_graph() {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    let project = write_project(&[("src/index.ts", "export function main() {}\n")]);
    let config = ResolvedConfig::new(Language::Typescript, project.path().to_string_lossy());
    let graph = reachgraph_extract::run_pipeline(&config).await.unwrap();

    let (tx, _rx) = tokio::sync::broadcast::channel(8);
    let state = reachgraph_server::ServerState::new(Some(graph), tx);
    let router = reachgraph_server::router::create_router(state);

    let response = router
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
