//! Default value functions for configuration, used by `#[serde(default = "...")]`.

pub fn default_true() -> bool {
    true
}

pub fn default_ping_interval() -> u64 {
    90
}

pub fn default_ping_timeout() -> u64 {
    120
}

pub fn default_registration_timeout() -> u64 {
    60
}

pub fn default_hold_period() -> u64 {
    900
}

pub fn default_chasetimelimit() -> u64 {
    180
}

pub fn default_reop_delay() -> u64 {
    600
}

pub fn default_nick_len() -> usize {
    30
}

pub fn default_channel_len() -> usize {
    50
}

pub fn default_max_bans() -> usize {
    60
}

pub fn default_id_window() -> u32 {
    2048
}

pub fn default_penalty_per_message() -> u32 {
    1
}

pub fn default_max_channels_per_user() -> usize {
    20
}
