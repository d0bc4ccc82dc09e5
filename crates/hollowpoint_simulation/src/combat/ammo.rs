//! Патроны, скорострельность, перезарядка, разброс
//!
//! Патроны — f32: max_ammo может быть бесконечным (оружие врагов), тогда
//! ammo_ratio всегда 1.0. Перезарядка снимает оружие с боя на
//! `ammo_reload_rate` секунд и затем мгновенно наполняет магазин до максимума.

use bevy::prelude::*;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::collaborators::{anim, AnimatorHandle};
use crate::combat::switching::WeaponSlots;
use crate::logger::log;

/// Режим спуска
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShootType {
    /// Выстрел на фронт нажатия
    Manual,
    /// Огонь пока кнопка удержана
    Automatic,
}

/// Статическое описание оружия (данные, не состояние)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponSpec {
    pub name: String,
    pub shoot_type: ShootType,
    pub damage: f32,
    /// Минимальный интервал между выстрелами, сек
    pub delay_between_shots: f32,
    /// Конус разброса в градусах (180 = вся сфера направлений)
    pub bullet_spread_angle: f32,
    pub bullets_per_shot: u32,
    /// Длительность перезарядки, сек
    pub ammo_reload_rate: f32,
    /// Ёмкость магазина; f32::INFINITY = бездонный
    pub max_ammo: f32,
    pub equip_sound: Option<String>,
    pub shoot_sound: Option<String>,
}

impl WeaponSpec {
    pub fn pistol() -> Self {
        Self {
            name: "Pistol".to_string(),
            shoot_type: ShootType::Manual,
            damage: 15.0,
            delay_between_shots: 0.3,
            bullet_spread_angle: 2.0,
            bullets_per_shot: 1,
            ammo_reload_rate: 1.2,
            max_ammo: 12.0,
            equip_sound: Some("pistol_equip".to_string()),
            shoot_sound: Some("pistol_shot".to_string()),
        }
    }

    pub fn rifle() -> Self {
        Self {
            name: "Rifle".to_string(),
            shoot_type: ShootType::Automatic,
            damage: 10.0,
            delay_between_shots: 0.1,
            bullet_spread_angle: 4.0,
            bullets_per_shot: 1,
            ammo_reload_rate: 2.0,
            max_ammo: 30.0,
            equip_sound: Some("rifle_equip".to_string()),
            shoot_sound: Some("rifle_shot".to_string()),
        }
    }

    pub fn enemy_blaster() -> Self {
        Self {
            name: "Blaster".to_string(),
            shoot_type: ShootType::Automatic,
            damage: 8.0,
            delay_between_shots: 0.5,
            bullet_spread_angle: 5.0,
            bullets_per_shot: 1,
            ammo_reload_rate: 1.5,
            max_ammo: f32::INFINITY,
            equip_sound: None,
            shoot_sound: Some("blaster_shot".to_string()),
        }
    }
}

/// Динамическое состояние патронов одного оружия
#[derive(Debug, Clone)]
pub struct WeaponAmmo {
    pub current_ammo: f32,
    pub last_shot_time: f32,
    reloading: bool,
    reload_start: f32,
    reload_requested: bool,
}

impl WeaponAmmo {
    pub fn new(max_ammo: f32) -> Self {
        Self {
            current_ammo: max_ammo,
            // Первый выстрел не должен ждать delay_between_shots
            last_shot_time: f32::NEG_INFINITY,
            reloading: false,
            reload_start: 0.0,
            reload_requested: false,
        }
    }

    pub fn is_reloading(&self) -> bool {
        self.reloading
    }

    /// Попытка выстрела: требуется целый патрон, истёкший интервал
    /// и отсутствие перезарядки. true = патрон списан.
    pub fn try_fire(&mut self, spec: &WeaponSpec, now: f32) -> bool {
        if self.reloading {
            return false;
        }
        if self.current_ammo < 1.0 {
            return false;
        }
        if now - self.last_shot_time < spec.delay_between_shots {
            return false;
        }
        self.current_ammo = (self.current_ammo - 1.0).max(0.0);
        self.last_shot_time = now;
        true
    }

    /// Трансляция кнопки огня в try_fire согласно режиму спуска
    pub fn handle_fire_input(&mut self, spec: &WeaponSpec, down: bool, held: bool, now: f32) -> bool {
        let wants_fire = match spec.shoot_type {
            ShootType::Manual => down,
            ShootType::Automatic => held,
        };
        wants_fire && self.try_fire(spec, now)
    }

    /// Ручной запрос перезарядки (игнорируется на полном магазине)
    pub fn request_reload(&mut self, spec: &WeaponSpec) {
        if !self.reloading && self.current_ammo < spec.max_ammo {
            self.reload_requested = true;
        }
    }

    /// Тик перезарядки: вход (по запросу или пустому магазину) и выход
    /// (мгновенное наполнение по истечении ammo_reload_rate)
    pub fn update(&mut self, spec: &WeaponSpec, now: f32) {
        if !self.reloading && (self.reload_requested || self.current_ammo < 1.0) {
            self.reloading = true;
            self.reload_requested = false;
            self.reload_start = now;
        }
        if self.reloading && now - self.reload_start >= spec.ammo_reload_rate {
            self.reloading = false;
            self.current_ammo = spec.max_ammo;
        }
    }

    /// Прерывание перезарядки (оружие убрано из рук)
    pub fn cancel_reload(&mut self) {
        self.reloading = false;
        self.reload_requested = false;
    }

    /// Наполненность магазина для HUD; бездонный магазин всегда 1.0
    pub fn ammo_ratio(&self, spec: &WeaponSpec) -> f32 {
        if spec.max_ammo.is_infinite() {
            return 1.0;
        }
        if spec.max_ammo <= 0.0 {
            return 0.0;
        }
        (self.current_ammo / spec.max_ammo).clamp(0.0, 1.0)
    }
}

/// Направление выстрела с разбросом: slerp от точного направления к
/// случайному, доля = угол/180. Внешний override применяется только
/// когда он шире собственного разброса оружия.
pub fn spread_direction(
    direction: Vec3,
    spread_angle: f32,
    override_angle: Option<f32>,
    rng: &mut ChaCha8Rng,
) -> Vec3 {
    let direction = direction.normalize_or_zero();
    if direction == Vec3::ZERO {
        return Vec3::NEG_Z;
    }

    let angle = override_angle.map_or(spread_angle, |o| o.max(spread_angle));
    let ratio = (angle / 180.0).clamp(0.0, 1.0);
    if ratio == 0.0 {
        return direction;
    }

    // Случайное единичное направление (rejection sampling по кубу)
    let random = loop {
        let v = Vec3::new(
            rng.gen::<f32>() * 2.0 - 1.0,
            rng.gen::<f32>() * 2.0 - 1.0,
            rng.gen::<f32>() * 2.0 - 1.0,
        );
        let len_sq = v.length_squared();
        if len_sq > 1e-4 && len_sq <= 1.0 {
            break v / len_sq.sqrt();
        }
    };

    let full_turn = Quat::from_rotation_arc(direction, random);
    Quat::IDENTITY.slerp(full_turn, ratio) * direction
}

/// Запрос ручной перезарядки активного оружия
#[derive(Event, Debug, Clone, Copy)]
pub struct ReloadIntent {
    pub entity: Entity,
}

pub fn apply_reload_intents(
    mut intents: EventReader<ReloadIntent>,
    mut actors: Query<&mut WeaponSlots>,
) {
    for intent in intents.read() {
        let Ok(mut slots) = actors.get_mut(intent.entity) else {
            continue;
        };
        if let Some(weapon) = slots.active_weapon_mut() {
            weapon.ammo.request_reload(&weapon.spec);
        }
    }
}

/// Фаза патронов: тик перезарядки активного оружия + анимация
pub fn update_weapon_ammo(
    time: Res<Time<Fixed>>,
    mut actors: Query<(Entity, &mut WeaponSlots, Option<&mut AnimatorHandle>)>,
) {
    let now = time.elapsed_secs();

    for (entity, mut slots, animator) in actors.iter_mut() {
        let Some(weapon) = slots.active_weapon_mut() else {
            continue;
        };
        let was_reloading = weapon.ammo.is_reloading();
        weapon.ammo.update(&weapon.spec, now);
        let is_reloading = weapon.ammo.is_reloading();
        let reload_rate = weapon.spec.ammo_reload_rate;

        if is_reloading && !was_reloading {
            log(&format!("🔄 Actor {:?} reloading ({:.1}s)", entity, reload_rate));
        }

        if let Some(mut animator) = animator {
            if is_reloading != was_reloading {
                animator.0.set_bool(anim::RELOADING, is_reloading);
                if is_reloading {
                    animator.0.set_float(anim::RELOAD_SPEED, reload_rate);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_first_shot_ignores_delay() {
        let spec = WeaponSpec::pistol();
        let mut ammo = WeaponAmmo::new(spec.max_ammo);
        assert!(ammo.try_fire(&spec, 0.0));
        assert_eq!(ammo.current_ammo, 11.0);
    }

    #[test]
    fn test_fire_rate_gate() {
        // Времена точно представимы в f32, чтобы граница сравнивалась без шума
        let mut spec = WeaponSpec::pistol();
        spec.delay_between_shots = 0.5;
        let mut ammo = WeaponAmmo::new(spec.max_ammo);
        assert!(ammo.try_fire(&spec, 1.0));
        assert!(!ammo.try_fire(&spec, 1.25));
        // Ровно на границе интервала выстрел разрешён
        assert!(ammo.try_fire(&spec, 1.5));
    }

    #[test]
    fn test_empty_magazine_blocks_fire() {
        let spec = WeaponSpec::pistol();
        let mut ammo = WeaponAmmo::new(0.5);
        assert!(!ammo.try_fire(&spec, 0.0));
    }

    #[test]
    fn test_auto_reload_on_empty_and_snap_refill() {
        let spec = WeaponSpec::pistol(); // reload 1.2
        let mut ammo = WeaponAmmo::new(1.0);
        assert!(ammo.try_fire(&spec, 0.0));
        assert_eq!(ammo.current_ammo, 0.0);

        ammo.update(&spec, 0.1);
        assert!(ammo.is_reloading());
        assert!(!ammo.try_fire(&spec, 0.5));

        // Перезарядка ещё идёт
        ammo.update(&spec, 1.0);
        assert!(ammo.is_reloading());
        assert_eq!(ammo.current_ammo, 0.0);

        // Завершение: мгновенное наполнение
        ammo.update(&spec, 0.1 + spec.ammo_reload_rate);
        assert!(!ammo.is_reloading());
        assert_eq!(ammo.current_ammo, spec.max_ammo);
    }

    #[test]
    fn test_manual_reload_ignored_when_full() {
        let spec = WeaponSpec::pistol();
        let mut ammo = WeaponAmmo::new(spec.max_ammo);
        ammo.request_reload(&spec);
        ammo.update(&spec, 0.0);
        assert!(!ammo.is_reloading());

        ammo.try_fire(&spec, 0.0);
        ammo.request_reload(&spec);
        ammo.update(&spec, 0.1);
        assert!(ammo.is_reloading());
    }

    #[test]
    fn test_cancel_reload_keeps_ammo() {
        let spec = WeaponSpec::pistol();
        let mut ammo = WeaponAmmo::new(1.0);
        ammo.try_fire(&spec, 0.0);
        ammo.update(&spec, 0.1);
        assert!(ammo.is_reloading());

        ammo.cancel_reload();
        assert!(!ammo.is_reloading());
        assert_eq!(ammo.current_ammo, 0.0);
    }

    #[test]
    fn test_infinite_ammo_ratio() {
        let spec = WeaponSpec::enemy_blaster();
        let mut ammo = WeaponAmmo::new(spec.max_ammo);
        assert_eq!(ammo.ammo_ratio(&spec), 1.0);
        ammo.try_fire(&spec, 0.0);
        assert_eq!(ammo.ammo_ratio(&spec), 1.0);
    }

    #[test]
    fn test_manual_vs_automatic_trigger() {
        let manual = WeaponSpec::pistol();
        let auto = WeaponSpec::rifle();

        let mut ammo = WeaponAmmo::new(manual.max_ammo);
        // Manual: удержание без фронта не стреляет
        assert!(!ammo.handle_fire_input(&manual, false, true, 0.0));
        assert!(ammo.handle_fire_input(&manual, true, true, 0.0));

        let mut ammo = WeaponAmmo::new(auto.max_ammo);
        // Automatic: удержание стреляет
        assert!(ammo.handle_fire_input(&auto, false, true, 0.0));
    }

    #[test]
    fn test_spread_zero_angle_is_exact() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let dir = spread_direction(Vec3::X, 0.0, None, &mut rng);
        assert_eq!(dir, Vec3::X);
    }

    #[test]
    fn test_spread_stays_within_cone() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let angle = 10.0_f32;
        for _ in 0..100 {
            let dir = spread_direction(Vec3::X, angle, None, &mut rng);
            assert!((dir.length() - 1.0).abs() < 1e-3);
            let deviation = dir.dot(Vec3::X).clamp(-1.0, 1.0).acos().to_degrees();
            assert!(deviation <= angle + 1e-2, "deviation {} > {}", deviation, angle);
        }
    }

    #[test]
    fn test_spread_override_only_widens() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        // Override уже собственного разброса — игнорируется
        for _ in 0..50 {
            let dir = spread_direction(Vec3::X, 10.0, Some(2.0), &mut rng);
            let deviation = dir.dot(Vec3::X).clamp(-1.0, 1.0).acos().to_degrees();
            assert!(deviation <= 10.0 + 1e-2);
        }
    }
}
