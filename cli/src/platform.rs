//! Host platform detection.
//!
//! [`PlatformDetector::detect`] inspects a captured environment and the
//! programs on `PATH` and never fails: anything it cannot determine becomes
//! [`UNKNOWN`].
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::config::env::{EnvSnapshot, parse_bool};
use crate::error::PlatformError;
use crate::exec::Executor;

/// Sentinel for values detection could not determine.
pub const UNKNOWN: &str = "unknown";

/// Programs looked up on `PATH`.
pub const KNOWN_TOOLS: &[&str] = &[
    "git", "conan", "cursor", "docker", "podman", "aws", "asterisk", "python3", "npx",
];

/// Operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    /// Linux distributions.
    Linux,
    /// Apple macOS.
    Macos,
    /// Microsoft Windows.
    Windows,
    /// Anything else.
    Unknown,
}

impl Os {
    /// The operating system this binary was built for.
    #[must_use]
    pub const fn host() -> Self {
        if cfg!(target_os = "linux") {
            Self::Linux
        } else if cfg!(target_os = "macos") {
            Self::Macos
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else {
            Self::Unknown
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::Macos => write!(f, "macos"),
            Self::Windows => write!(f, "windows"),
            Self::Unknown => write!(f, "{UNKNOWN}"),
        }
    }
}

impl FromStr for Os {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linux" => Ok(Self::Linux),
            "macos" | "darwin" | "osx" => Ok(Self::Macos),
            "windows" | "win32" => Ok(Self::Windows),
            other => Err(PlatformError::DetectionAmbiguous(format!(
                "unrecognised platform '{other}'"
            ))),
        }
    }
}

/// Everything downstream stages need to know about the host.
///
/// Built once per run and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformContext {
    /// Operating system family.
    pub os: Os,
    /// Kernel or OS release string.
    pub os_version: String,
    /// CPU architecture (`x86_64`, `aarch64`, ...).
    pub arch: String,
    /// Version reported by `python3 --version`.
    pub python_version: String,
    /// Whether the run happens on a CI runner.
    pub is_ci: bool,
    /// `github-actions`, `gitlab-ci`, `jenkins`, `unknown`, or `none`.
    pub ci_provider: String,
    /// Known programs found on `PATH`.
    pub available_tools: BTreeSet<String>,
    /// Login name.
    pub user: String,
    /// Home directory.
    pub home_dir: String,
    /// Login shell or command interpreter.
    pub shell: String,
    /// Conan home directory.
    pub conan_home: String,
}

impl PlatformContext {
    /// Name of the rule template matching this host, without extension.
    #[must_use]
    pub fn rule_template_name(&self) -> String {
        if self.is_ci {
            "ci-linux".to_string()
        } else {
            format!("{}-dev", self.os)
        }
    }

    /// Command used to launch MCP servers.
    #[must_use]
    pub const fn mcp_command(&self) -> &'static str {
        match self.os {
            Os::Windows => "npx.cmd",
            _ => "npx",
        }
    }

    /// Whether `tool` was found on `PATH`.
    #[must_use]
    pub fn has_tool(&self, tool: &str) -> bool {
        self.available_tools.contains(tool)
    }

    /// Template variables derived from this context.
    ///
    /// Every checked tool yields a `has_<tool>` boolean so templates can test
    /// for it without a membership check.
    #[must_use]
    pub fn to_variables(&self) -> BTreeMap<String, serde_json::Value> {
        use serde_json::Value;

        let mut vars = BTreeMap::new();
        let mut put = |k: &str, v: Value| {
            vars.insert(k.to_string(), v);
        };
        put("os", Value::from(self.os.to_string()));
        put("os_version", Value::from(self.os_version.clone()));
        put("arch", Value::from(self.arch.clone()));
        put("architecture", Value::from(self.arch.clone()));
        put("python_version", Value::from(self.python_version.clone()));
        put("is_ci", Value::from(self.is_ci));
        put("ci_provider", Value::from(self.ci_provider.clone()));
        put("user", Value::from(self.user.clone()));
        put("home", Value::from(self.home_dir.clone()));
        put("shell", Value::from(self.shell.clone()));
        put("conan_home", Value::from(self.conan_home.clone()));
        put("mcp_command", Value::from(self.mcp_command()));
        put("rule_template", Value::from(self.rule_template_name()));
        put(
            "available_tools",
            Value::from(self.available_tools.iter().cloned().collect::<Vec<_>>()),
        );
        for tool in KNOWN_TOOLS {
            let key = format!("has_{}", tool.replace(|c: char| !c.is_alphanumeric(), "_"));
            put(&key, Value::from(self.has_tool(tool)));
        }
        vars
    }
}

/// Detects the [`PlatformContext`] for a run.
#[derive(Debug)]
pub struct PlatformDetector<'a> {
    env: &'a EnvSnapshot,
    executor: &'a dyn Executor,
    platform_override: Option<&'a str>,
    ci_override: Option<&'a str>,
}

impl<'a> PlatformDetector<'a> {
    /// Create a detector reading `env` and probing programs through `executor`.
    #[must_use]
    pub const fn new(env: &'a EnvSnapshot, executor: &'a dyn Executor) -> Self {
        Self {
            env,
            executor,
            platform_override: None,
            ci_override: None,
        }
    }

    /// Apply explicit platform and CI overrides.
    #[must_use]
    pub const fn with_overrides(mut self, platform: Option<&'a str>, ci: Option<&'a str>) -> Self {
        self.platform_override = platform;
        self.ci_override = ci;
        self
    }

    /// Detect the platform, discarding warnings.
    #[must_use]
    pub fn detect(&self) -> PlatformContext {
        self.detect_with_warnings().0
    }

    /// Detect the platform and report every ambiguity that was resolved
    /// with a default.
    #[must_use]
    pub fn detect_with_warnings(&self) -> (PlatformContext, Vec<PlatformError>) {
        let mut warnings = Vec::new();

        let host = Os::host();
        let os = match self.platform_override {
            Some(raw) => raw.parse::<Os>().unwrap_or_else(|e| {
                warnings.push(e);
                host
            }),
            None => host,
        };

        let (is_ci, ci_provider) = self.detect_ci(&mut warnings);

        let available_tools: BTreeSet<String> = KNOWN_TOOLS
            .iter()
            .filter(|t| self.executor.which(t))
            .map(ToString::to_string)
            .collect();

        let os_version = if os == host {
            self.os_version(os)
        } else {
            UNKNOWN.to_string()
        };
        let python_version = if available_tools.contains("python3") {
            self.python_version()
        } else {
            UNKNOWN.to_string()
        };

        let user = self.first_of(&["USER", "USERNAME"]);
        let home_dir = self.first_of(&["HOME", "USERPROFILE"]);
        let shell = if os == Os::Windows {
            self.first_of(&["COMSPEC", "SHELL"])
        } else {
            self.first_of(&["SHELL"])
        };
        let conan_home = self.env.get("CONAN_USER_HOME").map_or_else(
            || match (home_dir.as_str(), os) {
                (UNKNOWN, _) => UNKNOWN.to_string(),
                (home, Os::Windows) => format!("{home}\\.conan2"),
                (home, _) => format!("{home}/.conan2"),
            },
            ToString::to_string,
        );

        let arch = match std::env::consts::ARCH {
            "" => UNKNOWN.to_string(),
            a => a.to_string(),
        };

        let ctx = PlatformContext {
            os,
            os_version,
            arch,
            python_version,
            is_ci,
            ci_provider,
            available_tools,
            user,
            home_dir,
            shell,
            conan_home,
        };
        (ctx, warnings)
    }

    fn detect_ci(&self, warnings: &mut Vec<PlatformError>) -> (bool, String) {
        let mut providers = Vec::new();
        if self.env.flag("GITHUB_ACTIONS") {
            providers.push("github-actions");
        }
        if self.env.flag("GITLAB_CI") {
            providers.push("gitlab-ci");
        }
        if self.env.is_set("JENKINS_URL") {
            providers.push("jenkins");
        }
        if providers.len() > 1 {
            warnings.push(PlatformError::DetectionAmbiguous(format!(
                "multiple CI providers detected ({}); using {}",
                providers.join(", "),
                providers.first().copied().unwrap_or(UNKNOWN)
            )));
        }

        let detected = self.env.flag("CI") || !providers.is_empty();
        let is_ci = match self.ci_override {
            Some(raw) => parse_bool(raw).unwrap_or_else(|| {
                warnings.push(PlatformError::DetectionAmbiguous(format!(
                    "unrecognised CI override '{raw}'"
                )));
                detected
            }),
            None => detected,
        };

        let provider = if is_ci {
            providers.first().copied().unwrap_or(UNKNOWN)
        } else {
            "none"
        };
        (is_ci, provider.to_string())
    }

    fn first_of(&self, keys: &[&str]) -> String {
        keys.iter()
            .find_map(|k| self.env.get(k))
            .unwrap_or(UNKNOWN)
            .to_string()
    }

    fn os_version(&self, os: Os) -> String {
        let result = match os {
            Os::Windows => self.executor.run("cmd", &["/C", "ver"]),
            Os::Linux | Os::Macos => self.executor.run("uname", &["-r"]),
            Os::Unknown => return UNKNOWN.to_string(),
        };
        result
            .ok()
            .map(|r| r.stdout.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    fn python_version(&self) -> String {
        self.executor
            .run_unchecked("python3", &["--version"])
            .ok()
            .filter(|r| r.success)
            .and_then(|r| {
                // Older interpreters print the version on stderr.
                let text = if r.stdout.trim().is_empty() {
                    r.stderr
                } else {
                    r.stdout
                };
                text.split_whitespace().nth(1).map(ToString::to_string)
            })
            .unwrap_or_else(|| UNKNOWN.to_string())
    }
}
