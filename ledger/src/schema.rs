//! Ledger schema.
//!
//! One statement per constant; `SqliteLedger::migrate` runs them in order.
//! Every statement is idempotent.

pub const CREATE_USER_STATS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS user_stats (
    user_address TEXT PRIMARY KEY,
    level INTEGER NOT NULL DEFAULT 1,
    xp INTEGER NOT NULL DEFAULT 0,
    total_earned TEXT NOT NULL DEFAULT '0',
    streak INTEGER NOT NULL DEFAULT 0,
    lessons_completed INTEGER NOT NULL DEFAULT 0,
    last_check_in TEXT,
    last_activity TEXT,
    version INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

pub const CREATE_LESSONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS lessons (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    difficulty TEXT NOT NULL,
    category TEXT NOT NULL,
    reward_amount TEXT NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT 1,
    sort_order INTEGER NOT NULL DEFAULT 0
)
"#;

pub const CREATE_LESSON_PROGRESS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS lesson_progress (
    id TEXT PRIMARY KEY,
    user_address TEXT NOT NULL,
    lesson_id TEXT NOT NULL,
    completed_at TEXT NOT NULL,
    xp_awarded INTEGER NOT NULL DEFAULT 0,
    reward_claimed BOOLEAN NOT NULL DEFAULT 0,
    claimed_at TEXT,
    UNIQUE (user_address, lesson_id)
)
"#;

pub const CREATE_ACHIEVEMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS achievements (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    icon TEXT NOT NULL,
    requirement TEXT NOT NULL,
    reward_xp INTEGER NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT 1,
    sort_order INTEGER NOT NULL DEFAULT 0
)
"#;

pub const CREATE_USER_ACHIEVEMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS user_achievements (
    id TEXT PRIMARY KEY,
    user_address TEXT NOT NULL,
    achievement_id TEXT NOT NULL,
    unlocked_at TEXT NOT NULL,
    xp_awarded INTEGER NOT NULL DEFAULT 0,
    UNIQUE (user_address, achievement_id)
)
"#;

pub const CREATE_DAILY_CHALLENGES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS daily_challenges (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    challenge_type TEXT NOT NULL,
    reward_amount TEXT NOT NULL,
    xp_reward INTEGER NOT NULL DEFAULT 0,
    target INTEGER NOT NULL DEFAULT 1,
    is_active BOOLEAN NOT NULL DEFAULT 1,
    sort_order INTEGER NOT NULL DEFAULT 0
)
"#;

pub const CREATE_USER_CHALLENGES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS user_challenges (
    id TEXT PRIMARY KEY,
    user_address TEXT NOT NULL,
    challenge_id TEXT NOT NULL,
    date TEXT NOT NULL,
    progress INTEGER NOT NULL DEFAULT 0,
    completed BOOLEAN NOT NULL DEFAULT 0,
    completed_at TEXT,
    reward_claimed BOOLEAN NOT NULL DEFAULT 0,
    claimed_at TEXT,
    expires_at TEXT NOT NULL,
    UNIQUE (user_address, challenge_id, date)
)
"#;

pub const CREATE_DAILY_TASKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS daily_tasks (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    task_type TEXT NOT NULL,
    reward_amount TEXT NOT NULL,
    target_value INTEGER NOT NULL DEFAULT 1,
    is_active BOOLEAN NOT NULL DEFAULT 1,
    sort_order INTEGER NOT NULL DEFAULT 0
)
"#;

pub const CREATE_USER_DAILY_TASKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS user_daily_tasks (
    id TEXT PRIMARY KEY,
    user_address TEXT NOT NULL,
    task_id TEXT NOT NULL,
    date TEXT NOT NULL,
    progress INTEGER NOT NULL DEFAULT 0,
    completed BOOLEAN NOT NULL DEFAULT 0,
    completed_at TEXT,
    reward_claimed BOOLEAN NOT NULL DEFAULT 0,
    claimed_at TEXT,
    UNIQUE (user_address, task_id, date)
)
"#;

pub const CREATE_DAILY_CHECKINS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS daily_checkins (
    id TEXT PRIMARY KEY,
    user_address TEXT NOT NULL,
    date TEXT NOT NULL,
    checked_in_at TEXT NOT NULL,
    reward_amount TEXT NOT NULL,
    consecutive_days INTEGER NOT NULL DEFAULT 1,
    xp_awarded INTEGER NOT NULL DEFAULT 0,
    reward_claimed BOOLEAN NOT NULL DEFAULT 0,
    claimed_at TEXT,
    UNIQUE (user_address, date)
)
"#;

// `seq` gives a strict creation order independent of clock resolution.
pub const CREATE_REWARD_TRANSACTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS reward_transactions (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    user_address TEXT NOT NULL,
    reward_type TEXT NOT NULL,
    reward_id TEXT,
    amount TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'sent', 'failed')),
    transaction_hash TEXT,
    attempts INTEGER NOT NULL DEFAULT 0,
    last_error TEXT,
    next_attempt_at INTEGER,
    claim_propagated BOOLEAN NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    sent_at TEXT
)
"#;

pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_lesson_progress_user ON lesson_progress(user_address)",
    "CREATE INDEX IF NOT EXISTS idx_user_achievements_user ON user_achievements(user_address)",
    "CREATE INDEX IF NOT EXISTS idx_user_challenges_user_date ON user_challenges(user_address, date)",
    "CREATE INDEX IF NOT EXISTS idx_user_daily_tasks_user_date ON user_daily_tasks(user_address, date)",
    "CREATE INDEX IF NOT EXISTS idx_daily_checkins_user ON daily_checkins(user_address, date)",
    "CREATE INDEX IF NOT EXISTS idx_reward_transactions_status ON reward_transactions(status, next_attempt_at)",
    "CREATE INDEX IF NOT EXISTS idx_reward_transactions_user ON reward_transactions(user_address)",
];

pub const CREATE_TABLES: &[&str] = &[
    CREATE_USER_STATS_TABLE,
    CREATE_LESSONS_TABLE,
    CREATE_LESSON_PROGRESS_TABLE,
    CREATE_ACHIEVEMENTS_TABLE,
    CREATE_USER_ACHIEVEMENTS_TABLE,
    CREATE_DAILY_CHALLENGES_TABLE,
    CREATE_USER_CHALLENGES_TABLE,
    CREATE_DAILY_TASKS_TABLE,
    CREATE_USER_DAILY_TASKS_TABLE,
    CREATE_DAILY_CHECKINS_TABLE,
    CREATE_REWARD_TRANSACTIONS_TABLE,
];
