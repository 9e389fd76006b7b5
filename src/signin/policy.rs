//! Reward policy
//! Mission: compute the daily sign-in reward and its experience delta
//! from the continuous-day streak (spec section 4.4).

use crate::config::{RewardConfig, RewardMode};
use rand::Rng;

pub struct RewardOutcome {
    pub reward: i64,
    pub experience: i64,
}

/// Computes the reward for a streak of `continuous_days`, per the
/// configured mode. `continuous_days` is always >= 1.
pub fn compute_reward(continuous_days: i64, config: &RewardConfig) -> RewardOutcome {
    let reward = match config.mode {
        RewardMode::Fixed => config.fixed_reward,
        RewardMode::Increment => {
            let cycle_index = (continuous_days - 1).rem_euclid(config.increment_cycle);
            let raw = config.increment_base + cycle_index * config.increment_step;
            raw.min(config.clamp)
        }
        RewardMode::Random => {
            let mut rng = rand::thread_rng();
            rng.gen_range(config.random_min..=config.random_max)
        }
    };
    let reward = reward.max(1);

    let experience = if config.experience_reward == 0.0 {
        0
    } else {
        (reward as f64 * config.experience_reward).round() as i64
    };

    RewardOutcome { reward, experience }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config(mode: RewardMode) -> RewardConfig {
        RewardConfig {
            mode,
            fixed_reward: 10,
            increment_base: 5,
            increment_step: 1,
            increment_cycle: 7,
            clamp: 30,
            random_min: 5,
            random_max: 15,
            experience_reward: 0.0,
        }
    }

    #[test]
    fn fixed_mode_always_returns_the_same_reward() {
        let config = base_config(RewardMode::Fixed);
        assert_eq!(compute_reward(1, &config).reward, 10);
        assert_eq!(compute_reward(50, &config).reward, 10);
    }

    #[test]
    fn increment_mode_cycles_and_clamps() {
        let config = base_config(RewardMode::Increment);
        assert_eq!(compute_reward(1, &config).reward, 5);
        assert_eq!(compute_reward(2, &config).reward, 6);
        assert_eq!(compute_reward(7, &config).reward, 11);
        // continuous=8 restarts the 7-day cycle at index 0.
        assert_eq!(compute_reward(8, &config).reward, 5);
    }

    #[test]
    fn increment_mode_clamps_to_configured_ceiling() {
        let mut config = base_config(RewardMode::Increment);
        config.clamp = 6;
        assert_eq!(compute_reward(7, &config).reward, 6);
    }

    #[test]
    fn random_mode_stays_within_bounds() {
        let config = base_config(RewardMode::Random);
        for day in 1..20 {
            let reward = compute_reward(day, &config).reward;
            assert!(reward >= config.random_min && reward <= config.random_max);
        }
    }

    #[test]
    fn experience_is_zero_when_unconfigured() {
        let config = base_config(RewardMode::Fixed);
        assert_eq!(compute_reward(1, &config).experience, 0);
    }

    #[test]
    fn experience_scales_with_reward_and_rounds() {
        let mut config = base_config(RewardMode::Fixed);
        config.experience_reward = 0.5;
        assert_eq!(compute_reward(1, &config).experience, 5);
    }
}
