// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Integration tests for the metaweave CLI commands

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const PERSON: &str = "package com.example;

import org.springframework.roo.addon.javabean.annotations.RooJavaBean;

@RooJavaBean
public class Person {
    private String name;
}
";

/// Project with one annotated governor
fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("src/main/java/com/example/Person.java");
    fs::create_dir_all(source.parent().unwrap()).unwrap();
    fs::write(source, PERSON).unwrap();
    dir
}

/// metaweave isolated from the caller's environment and user config
fn metaweave(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("metaweave").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("METAWEAVE_CONFIG")
        .env("HOME", root)
        .env("XDG_CONFIG_HOME", root.join(".config"))
        .arg("--root")
        .arg(root)
        .arg("--no-color");
    cmd
}

#[test]
fn test_generate_writes_itd() {
    let dir = project();

    metaweave(dir.path())
        .arg("generate")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 created"));

    let itd = dir.path().join("src/main/java/com/example/Person_Roo_JavaBean.aj");
    let content = fs::read_to_string(itd).unwrap();
    assert!(content.contains("privileged aspect Person_Roo_JavaBean"));
}

#[test]
fn test_generate_twice_changes_nothing() {
    let dir = project();
    metaweave(dir.path()).arg("generate").assert().success();

    metaweave(dir.path())
        .args(["--json", "generate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"created\": 0"))
        .stdout(predicate::str::contains("\"updated\": 0"));
}

#[test]
fn test_status_json() {
    let dir = project();

    let output = metaweave(dir.path())
        .args(["--json", "status"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["files"]["created"], 1);
    assert!(status["registry"]["edges"].as_u64().unwrap() >= 3);
}

#[test]
fn test_graph_dot() {
    let dir = project();

    metaweave(dir.path())
        .args(["graph", "--format", "dot"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("digraph metadata {"))
        .stdout(predicate::str::contains(
            "PhysicalTypeIdentifier#SRC_MAIN_JAVA?com.example.Person",
        ));
}

#[test]
fn test_graph_to_file() {
    let dir = project();
    let out = dir.path().join("graph.json");

    metaweave(dir.path())
        .args(["graph", "--format", "json", "--output"])
        .arg(&out)
        .assert()
        .success();

    let edges: serde_json::Value = serde_json::from_str(&fs::read_to_string(out).unwrap()).unwrap();
    assert!(edges.as_array().unwrap().iter().any(|e| e["downstream"]
        .as_str()
        .unwrap()
        .starts_with("MID:org.springframework.roo.addon.javabean.JavaBeanMetadata#")));
}

#[test]
fn test_graph_unknown_format_fails() {
    let dir = project();

    metaweave(dir.path())
        .args(["graph", "--format", "yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown graph format"));
}

#[test]
fn test_id_command() {
    let dir = TempDir::new().unwrap();

    metaweave(dir.path())
        .args(["id", "MID:com.example.Provider#SRC_MAIN_JAVA?com.example.Bar"])
        .assert()
        .success()
        .stdout(predicate::str::contains("class:    com.example.Provider"))
        .stdout(predicate::str::contains("type:     com.example.Bar"));

    metaweave(dir.path()).args(["id", "bogus"]).assert().failure();
}

#[test]
fn test_config_show_reads_project_file() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("metaweave.toml"), "cache_capacity = 42\n").unwrap();

    metaweave(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cache_capacity = 42"));
}

#[test]
fn test_completions() {
    let dir = TempDir::new().unwrap();

    metaweave(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("metaweave"));
}
