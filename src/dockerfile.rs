//! Dockerfile generation, verification and interpolation
//!
//! Instruction order is fixed because Docker build semantics are
//! order-sensitive for layer caching. Generation is deterministic: identical
//! configuration yields byte-identical output.

use crate::{config::*, error::*};
use lazy_static::lazy_static;
use regex::Regex;
use std::{collections::BTreeMap, fs, path::Path};

/// Generate Dockerfile text from a build configuration.
///
/// Emission order: FROM, MAINTAINER, WORKDIR, ENV, LABEL, EXPOSE, RUN,
/// COPY (assembly), VOLUME, USER, HEALTHCHECK, ENTRYPOINT, CMD.
pub fn generate(build: &BuildConfiguration) -> String {
    let mut out = String::new();
    let mut line = |s: String| {
        out.push_str(&s);
        out.push('\n');
    };

    line(format!("FROM {}", build.from));
    if let Some(maintainer) = &build.maintainer {
        line(format!("MAINTAINER {}", maintainer));
    }
    if let Some(workdir) = &build.workdir {
        line(format!("WORKDIR {}", workdir));
    }
    for (key, value) in &build.env {
        line(format!("ENV {}={}", key, value));
    }
    for (key, value) in &build.labels {
        line(format!("LABEL {}=\"{}\"", key, value));
    }
    if !build.ports.is_empty() {
        line(format!("EXPOSE {}", build.ports.join(" ")));
    }
    if !build.run.is_empty() {
        if build.optimise {
            // One coalesced layer instead of one per command
            line(format!("RUN {}", build.run.join(" && ")));
        } else {
            for command in &build.run {
                line(format!("RUN {}", command));
            }
        }
    }
    if let Some(assembly) = &build.assembly {
        let target = assembly.target_dir();
        line(format!("COPY {} {}", assembly.name, target));
        if assembly.user() != "root" {
            line(format!("RUN chown -R {} {}", assembly.user(), target));
        }
    }
    for volume in &build.volumes {
        line(format!("VOLUME [\"{}\"]", volume));
    }
    if let Some(user) = &build.user {
        line(format!("USER {}", user));
    }
    if let Some(healthcheck) = &build.healthcheck {
        line(render_healthcheck(healthcheck));
    }
    if let Some(entrypoint) = &build.entrypoint {
        line(format!("ENTRYPOINT {}", entrypoint.render()));
    }
    if let Some(cmd) = &build.cmd {
        line(format!("CMD {}", cmd.render()));
    }
    out
}

fn render_healthcheck(check: &HealthCheck) -> String {
    if check.none {
        return "HEALTHCHECK NONE".to_string();
    }
    let mut parts = vec!["HEALTHCHECK".to_string()];
    if let Some(interval) = &check.interval {
        parts.push(format!("--interval={}", interval));
    }
    if let Some(timeout) = &check.timeout {
        parts.push(format!("--timeout={}", timeout));
    }
    if let Some(start_period) = &check.start_period {
        parts.push(format!("--start-period={}", start_period));
    }
    if let Some(retries) = check.retries {
        parts.push(format!("--retries={}", retries));
    }
    if let Some(cmd) = &check.cmd {
        parts.push(format!("CMD {}", cmd.render()));
    }
    parts.join(" ")
}

/// Whether any ADD/COPY instruction references the assembly name.
///
/// Comment lines and instruction flags such as `--chown` are skipped.
pub fn references_assembly(content: &str, assembly_name: &str) -> bool {
    for raw in content.lines() {
        let trimmed = raw.trim();
        if trimmed.starts_with('#') {
            continue;
        }
        let mut tokens = trimmed.split_whitespace();
        match tokens.next() {
            Some(instruction)
                if instruction.eq_ignore_ascii_case("ADD")
                    || instruction.eq_ignore_ascii_case("COPY") => {}
            _ => continue,
        }
        for token in tokens {
            if token.starts_with("--") {
                continue;
            }
            if token.contains(assembly_name) {
                return true;
            }
        }
    }
    false
}

/// Verify a user-supplied Dockerfile against the configured assembly.
///
/// A Dockerfile may legitimately not need the assembly, so a missing
/// reference is a warning, never an error.
pub fn verify(dockerfile: &Path, assembly_name: &str) -> Result<()> {
    let content = fs::read_to_string(dockerfile)?;
    if !references_assembly(&content, assembly_name) {
        log::warn!(
            "Dockerfile {} does not contain an ADD or COPY referencing the assembly '{}'; \
             the assembly will be ignored",
            dockerfile.display(),
            assembly_name
        );
    }
    Ok(())
}

lazy_static! {
    static ref PROPERTY_RE: Regex = Regex::new(r"\$\{([^}]+)\}").unwrap();
}

/// Substitute `${key}` build-time properties. Unknown keys are left intact.
pub fn interpolate(content: &str, properties: &BTreeMap<String, String>) -> String {
    PROPERTY_RE
        .replace_all(content, |captures: &regex::Captures| {
            let key = &captures[1];
            match properties.get(key) {
                Some(value) => value.clone(),
                None => captures[0].to_string(),
            }
        })
        .into_owned()
}
