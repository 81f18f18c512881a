// Copyright 2023 System76 <info@system76.com>
// SPDX-License-Identifier: GPL-3.0-only

use cosmic_config::{self, cosmic_config_derive::CosmicConfigEntry, CosmicConfigEntry};

#[derive(Debug, Clone, CosmicConfigEntry, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[version = 1]
pub struct AgeAppletConfig {
    pub first_day_of_week: u8,
    pub show_age_in_panel: bool,
}

impl Default for AgeAppletConfig {
    fn default() -> Self {
        Self {
            first_day_of_week: 6,
            show_age_in_panel: true,
        }
    }
}
