/// Constants module to avoid magic numbers in the codebase

// Timeouts
pub const COMMAND_TIMEOUT_SECS: u64 = 30;

// Agent loop
pub const DEFAULT_MAX_ITERATIONS: usize = 50;
pub const REPEAT_WINDOW: usize = 5;
pub const REPEAT_THRESHOLD: usize = 3;

// Output caps for tool observations
pub const READ_OUTPUT_CAP: usize = 10_000;
pub const COMMAND_OUTPUT_CAP: usize = 2_000;
pub const SEARCH_MATCHES_PER_FILE: usize = 3;
pub const SEARCH_RESULT_CAP: usize = 20;
pub const LISTING_ENTRY_CAP: usize = 50;

// Context packing
pub const DEFAULT_CONTEXT_BUDGET_TOKENS: usize = 16_384;
pub const DEFAULT_OVERLAP_WEIGHT: f64 = 0.5;
pub const DEFAULT_RECENCY_WEIGHT: f64 = 0.2;
pub const DEFAULT_TOUCHED_WEIGHT: f64 = 0.3;
pub const DEFAULT_HISTORY_RESERVE: f64 = 0.25;
pub const DEFAULT_RECENT_STEPS: usize = 6;
pub const MIN_CANDIDATE_SCORE: f64 = 0.1;
pub const MAX_CANDIDATE_FILE_SIZE: u64 = 1024 * 1024; // 1MB

// Backup suffixes, written next to the original before any mutation
pub const BACKUP_SUFFIX: &str = "backup";
pub const DELETED_SUFFIX: &str = "deleted";

// On-disk state directory inside the sandbox
pub const STATE_DIR: &str = ".selkie";
pub const SESSIONS_DIR: &str = "sessions";
pub const MEMORY_FILE: &str = "memory/PROJECT.md";

// File patterns excluded from candidate scanning
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    "*.log",
    "*.tmp",
    "*.backup",
    "*.deleted",
    ".git/*",
    ".env",
    "target/*",
    "node_modules/*",
    "__pycache__/*",
    ".venv/*",
    "venv/*",
    "*.pyc",
    "*.pyo",
    ".DS_Store",
    "Thumbs.db",
    "*.swp",
    "*.swo",
    "*~",
    ".idea/*",
    ".vscode/*",
    "*.iml",
    ".pytest_cache/*",
    ".mypy_cache/*",
    ".ruff_cache/*",
    "dist/*",
    "build/*",
    "*.egg-info/*",
];

// Dangerous commands (for safety checks)
pub const DANGEROUS_COMMANDS: &[&str] = &[
    "rm -rf /",
    "rm -rf /*",
    "rm -rf ~",
    "rm -rf ~/",
    "format c:",
    "del /f /s /q c:",
    ":(){ :|:& };:", // Fork bomb
    "mkfs",
    "dd if=/dev/zero",
    "chmod -r 777 /",
    "chmod -r 000 /",
    "chmod 777 /",
    "chown -r",
    "> /dev/sda",
    "wget -o - | sh",
    "wget | sh",
    "curl | bash",
    "curl -s | bash",
    "sudo ",
    "nc -l",
];

// Shell commands that delete things and therefore need confirmation
pub const DELETION_COMMANDS: &[&str] = &["rm ", "del ", "rmdir ", "unlink ", "shred "];

// Sensitive paths that are never touched, even inside the sandbox
pub const SENSITIVE_PATTERNS: &[&str] = &[
    ".ssh",
    ".aws",
    ".env",
    ".gnupg",
    "id_rsa",
    "id_dsa",
    "id_ecdsa",
    "id_ed25519",
    ".git/config",
    ".npmrc",
    ".pypirc",
    ".pem",
    ".pfx",
];
