//! Базовые компоненты акторов
//!
//! Health — единственный источник правды о живости. Все изменения идут
//! через damage/heal/kill, которые возвращают фактическую дельту —
//! события о нулевых изменениях не рассылаются.

use bevy::prelude::*;

/// Маркер актора (enemy, player) — требует Health
#[derive(Component, Default)]
#[require(Health)]
pub struct Actor;

/// Маркер игрока
#[derive(Component, Default)]
pub struct Player;

/// Здоровье актора
///
/// `alive` переходит в false ровно один раз через `settle_death` —
/// повторные обработки смерти исключены на уровне компонента.
#[derive(Component, Debug, Clone)]
pub struct Health {
    pub current: f32,
    pub max: f32,
    pub invincible: bool,
    alive: bool,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self {
            current: max,
            max,
            invincible: false,
            alive: true,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Урон с clamp к нулю; возвращает фактически снятое здоровье.
    /// Invincible актор получает 0.
    pub fn damage(&mut self, amount: f32) -> f32 {
        if self.invincible {
            return 0.0;
        }
        let before = self.current;
        self.current = (self.current - amount).max(0.0);
        before - self.current
    }

    /// Лечение с clamp к максимуму; возвращает фактически восстановленное
    pub fn heal(&mut self, amount: f32) -> f32 {
        let before = self.current;
        self.current = (self.current + amount).min(self.max);
        self.current - before
    }

    /// Мгновенная смерть: обнуляет здоровье, игнорируя invincible.
    /// Дельтой всегда репортится максимум, сколько бы здоровья ни оставалось.
    pub fn kill(&mut self) -> f32 {
        self.current = 0.0;
        self.max
    }

    /// Фиксирует смерть при current == 0. true только при первом вызове,
    /// который реально перевёл актора в мёртвое состояние.
    pub fn settle_death(&mut self) -> bool {
        if self.alive && self.current <= 0.0 {
            self.alive = false;
            return true;
        }
        false
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damage_clamps_and_returns_delta() {
        let mut health = Health::new(100.0);
        assert_eq!(health.damage(30.0), 30.0);
        assert_eq!(health.current, 70.0);

        // Урон больше остатка — дельта равна остатку
        assert_eq!(health.damage(500.0), 70.0);
        assert_eq!(health.current, 0.0);

        // Урон по трупу — нулевая дельта
        assert_eq!(health.damage(10.0), 0.0);
    }

    #[test]
    fn test_invincible_takes_no_damage() {
        let mut health = Health::new(100.0);
        health.invincible = true;
        assert_eq!(health.damage(50.0), 0.0);
        assert_eq!(health.current, 100.0);
    }

    #[test]
    fn test_kill_ignores_invincible() {
        let mut health = Health::new(100.0);
        health.invincible = true;
        assert_eq!(health.kill(), 100.0);
        assert_eq!(health.current, 0.0);
    }

    #[test]
    fn test_kill_reports_max_even_when_damaged() {
        let mut health = Health::new(100.0);
        health.damage(40.0);
        assert_eq!(health.kill(), 100.0);
        assert_eq!(health.current, 0.0);
    }

    #[test]
    fn test_heal_clamps_to_max() {
        let mut health = Health::new(100.0);
        health.damage(40.0);
        assert_eq!(health.heal(100.0), 40.0);
        assert_eq!(health.current, 100.0);

        // Лечение на полном здоровье — нулевая дельта
        assert_eq!(health.heal(10.0), 0.0);
    }

    #[test]
    fn test_settle_death_fires_once() {
        let mut health = Health::new(100.0);
        assert!(!health.settle_death());

        health.kill();
        assert!(health.settle_death());
        assert!(!health.settle_death());
        assert!(!health.is_alive());
    }
}
