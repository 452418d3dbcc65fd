pub const PLUG_TABLE: &str = "CREATE TABLE IF NOT EXISTS plug (
                                plug_id INTEGER PRIMARY KEY AUTOINCREMENT,
                                plug_name TEXT NOT NULL UNIQUE
                            );";

pub const RESULT_TABLE: &str = "CREATE TABLE IF NOT EXISTS result (
                                result_id INTEGER PRIMARY KEY AUTOINCREMENT,
                                plug_id INTEGER NOT NULL REFERENCES plug(plug_id),
                                timestamp_ms INTEGER NOT NULL,
                                voltage REAL,
                                current REAL,
                                active_power REAL,
                                apparent_power REAL,
                                reactive_power REAL,
                                power_factor REAL
                            );";

//No unique index on the bucket key, duplicates are reported by the aggregation upsert
pub const AVERAGE_TABLE: &str = "CREATE TABLE IF NOT EXISTS average (
                                    average_id INTEGER PRIMARY KEY AUTOINCREMENT,
                                    plug_id INTEGER NOT NULL REFERENCES plug(plug_id),
                                    bucket_start_ms INTEGER NOT NULL,
                                    duration_ms INTEGER NOT NULL,
                                    voltage REAL,
                                    current REAL,
                                    active_power REAL,
                                    apparent_power REAL,
                                    reactive_power REAL,
                                    power_factor REAL
                                );";

pub const RESULT_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS result_plug_time ON result (plug_id, timestamp_ms);";

pub const AVERAGE_INDEX: &str = "CREATE INDEX IF NOT EXISTS average_bucket
                                    ON average (plug_id, bucket_start_ms, duration_ms);";
