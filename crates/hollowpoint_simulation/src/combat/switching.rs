//! Слоты оружия и стейт-машина переключения
//!
//! Down → PutUpNew → Up при пустых руках, Up → PutDownPrevious → PutUpNew → Up
//! при смене. Каждая фаза длится switch_delay секунд. Выбор следующего слота —
//! циклическая дистанция по направлению скролла, занятый слот с минимальной
//! дистанцией побеждает (при равенстве — первый найденный).

use bevy::prelude::*;

use crate::collaborators::AudioHandle;
use crate::combat::ammo::{WeaponAmmo, WeaponSpec};
use crate::logger::{log, log_warning};

pub const WEAPON_SLOT_COUNT: usize = 9;

/// Фаза переключения оружия
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwitchState {
    /// Руки пусты
    #[default]
    Down,
    /// Текущее оружие опускается
    PutDownPrevious,
    /// Новое оружие поднимается
    PutUpNew,
    /// Оружие в руках, можно стрелять
    Up,
}

/// Оружие в слоте: описание + патроны + видимость модели
#[derive(Debug, Clone)]
pub struct WeaponInstance {
    pub spec: WeaponSpec,
    pub ammo: WeaponAmmo,
    pub visible: bool,
}

impl WeaponInstance {
    pub fn new(spec: WeaponSpec) -> Self {
        let ammo = WeaponAmmo::new(spec.max_ammo);
        Self {
            spec,
            ammo,
            visible: false,
        }
    }
}

/// Побочный эффект перехода стейт-машины (звук/видимость обрабатывает система)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchTransition {
    /// Слот стал активным (модель показана)
    Activated { slot: usize },
    /// Слот деактивирован (модель скрыта, перезарядка прервана)
    Deactivated { slot: usize },
    /// Новое оружие поднято, огонь разрешён
    Raised,
    /// Оружие опущено, руки пусты
    LoweredEmpty,
}

/// Инвентарь актора: фиксированные слоты + стейт-машина переключения
#[derive(Component, Debug, Clone)]
pub struct WeaponSlots {
    slots: Vec<Option<WeaponInstance>>,
    active_index: Option<usize>,
    pending_index: Option<usize>,
    pub switch_state: SwitchState,
    pub switch_delay: f32,
    switch_started: f32,
}

impl Default for WeaponSlots {
    fn default() -> Self {
        Self::new(WEAPON_SLOT_COUNT, 1.0)
    }
}

impl WeaponSlots {
    pub fn new(slot_count: usize, switch_delay: f32) -> Self {
        Self {
            slots: (0..slot_count).map(|_| None).collect(),
            active_index: None,
            pending_index: None,
            switch_state: SwitchState::Down,
            switch_delay,
            switch_started: 0.0,
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active_index
    }

    /// Добавление в первый свободный слот. Дубликаты по имени отклоняются.
    pub fn add_weapon(&mut self, spec: WeaponSpec) -> Option<usize> {
        if self
            .slots
            .iter()
            .flatten()
            .any(|w| w.spec.name == spec.name)
        {
            log_warning(&format!("Weapon '{}' already in slots, skipped", spec.name));
            return None;
        }
        let free = self.slots.iter().position(|s| s.is_none())?;
        self.slots[free] = Some(WeaponInstance::new(spec));
        Some(free)
    }

    pub fn weapon_at(&self, index: usize) -> Option<&WeaponInstance> {
        self.slots.get(index)?.as_ref()
    }

    pub fn weapon_at_mut(&mut self, index: usize) -> Option<&mut WeaponInstance> {
        self.slots.get_mut(index)?.as_mut()
    }

    pub fn active_weapon(&self) -> Option<&WeaponInstance> {
        self.weapon_at(self.active_index?)
    }

    pub fn active_weapon_mut(&mut self) -> Option<&mut WeaponInstance> {
        self.weapon_at_mut(self.active_index?)
    }

    /// Циклическая дистанция от from до to по направлению скролла.
    /// Пустые руки считаются позицией -1. Результат всегда в [0, len).
    pub fn cyclic_distance(&self, from: Option<usize>, to: usize, ascending: bool) -> usize {
        let len = self.slots.len() as i64;
        let from = from.map_or(-1, |i| i as i64);
        let raw = if ascending {
            to as i64 - from
        } else {
            from - to as i64
        };
        raw.rem_euclid(len) as usize
    }

    /// Скролл: ближайший занятый слот по направлению
    pub fn request_switch(&mut self, ascending: bool, now: f32) -> Vec<SwitchTransition> {
        let mut best: Option<(usize, usize)> = None;
        for index in 0..self.slots.len() {
            if self.slots[index].is_none() || Some(index) == self.active_index {
                continue;
            }
            let distance = self.cyclic_distance(self.active_index, index, ascending);
            // Строгое < сохраняет первый найденный при равенстве
            if best.map_or(true, |(_, best_distance)| distance < best_distance) {
                best = Some((index, distance));
            }
        }
        match best {
            Some((index, _)) => self.request_switch_to(index, now),
            None => Vec::new(),
        }
    }

    /// Переключение на конкретный слот (хоткеи 1..9)
    pub fn request_switch_to(&mut self, index: usize, now: f32) -> Vec<SwitchTransition> {
        // Посреди анимации переключения новые запросы игнорируются
        if !matches!(self.switch_state, SwitchState::Down | SwitchState::Up) {
            return Vec::new();
        }
        if Some(index) == self.active_index || self.weapon_at(index).is_none() {
            return Vec::new();
        }
        self.begin_switch(index, now)
    }

    fn begin_switch(&mut self, index: usize, now: f32) -> Vec<SwitchTransition> {
        self.switch_started = now;
        if self.active_index.is_none() {
            // Пустые руки: сразу поднимаем новое
            self.active_index = Some(index);
            if let Some(weapon) = self.weapon_at_mut(index) {
                weapon.visible = true;
            }
            self.switch_state = SwitchState::PutUpNew;
            vec![SwitchTransition::Activated { slot: index }]
        } else {
            self.pending_index = Some(index);
            self.switch_state = SwitchState::PutDownPrevious;
            Vec::new()
        }
    }

    /// Прогресс текущей фазы в [0, 1]
    pub fn switch_ratio(&self, now: f32) -> f32 {
        if self.switch_delay <= 0.0 {
            return 1.0;
        }
        ((now - self.switch_started) / self.switch_delay).clamp(0.0, 1.0)
    }

    /// Тик стейт-машины; вызывается строго после обработки огня
    pub fn advance(&mut self, now: f32) -> Vec<SwitchTransition> {
        let mut transitions = Vec::new();
        if self.switch_ratio(now) < 1.0 {
            return transitions;
        }

        match self.switch_state {
            SwitchState::PutDownPrevious => {
                if let Some(old) = self.active_index {
                    if let Some(weapon) = self.weapon_at_mut(old) {
                        weapon.visible = false;
                        weapon.ammo.cancel_reload();
                    }
                    transitions.push(SwitchTransition::Deactivated { slot: old });
                }
                match self.pending_index.take() {
                    Some(next) => {
                        self.active_index = Some(next);
                        if let Some(weapon) = self.weapon_at_mut(next) {
                            weapon.visible = true;
                        }
                        self.switch_state = SwitchState::PutUpNew;
                        transitions.push(SwitchTransition::Activated { slot: next });
                    }
                    None => {
                        self.active_index = None;
                        self.switch_state = SwitchState::Down;
                        transitions.push(SwitchTransition::LoweredEmpty);
                    }
                }
                self.switch_started = now;
            }
            SwitchState::PutUpNew => {
                self.switch_state = SwitchState::Up;
                transitions.push(SwitchTransition::Raised);
            }
            SwitchState::Down | SwitchState::Up => {}
        }
        transitions
    }
}

/// Запрос скролла оружия
#[derive(Event, Debug, Clone, Copy)]
pub struct SwitchWeaponIntent {
    pub entity: Entity,
    pub ascending: bool,
}

/// Активным стало оружие в слоте
#[derive(Event, Debug, Clone, Copy)]
pub struct WeaponSwitched {
    pub entity: Entity,
    pub slot: usize,
}

fn apply_transitions(
    entity: Entity,
    slots: &WeaponSlots,
    transitions: &[SwitchTransition],
    audio: Option<&mut AudioHandle>,
    switched: &mut EventWriter<WeaponSwitched>,
) {
    let mut audio = audio;
    for transition in transitions {
        if let SwitchTransition::Activated { slot } = transition {
            switched.write(WeaponSwitched { entity, slot: *slot });
            if let Some(weapon) = slots.weapon_at(*slot) {
                log(&format!(
                    "🔫 Actor {:?} switching to '{}' (slot {})",
                    entity, weapon.spec.name, slot
                ));
                if let (Some(audio), Some(clip)) = (audio.as_mut(), &weapon.spec.equip_sound) {
                    audio.0.play_one_shot(clip);
                }
            }
        }
    }
}

/// Фаза: входящие запросы переключения
pub fn process_switch_intents(
    time: Res<Time<Fixed>>,
    mut intents: EventReader<SwitchWeaponIntent>,
    mut actors: Query<(&mut WeaponSlots, Option<&mut AudioHandle>)>,
    mut switched: EventWriter<WeaponSwitched>,
) {
    let now = time.elapsed_secs();
    for intent in intents.read() {
        let Ok((mut slots, audio)) = actors.get_mut(intent.entity) else {
            continue;
        };
        let transitions = slots.request_switch(intent.ascending, now);
        apply_transitions(
            intent.entity,
            &slots,
            &transitions,
            audio.map(Mut::into_inner),
            &mut switched,
        );
    }
}

/// Фаза: тик стейт-машины переключения (строго после обработки огня)
pub fn advance_weapon_switch(
    time: Res<Time<Fixed>>,
    mut actors: Query<(Entity, &mut WeaponSlots, Option<&mut AudioHandle>)>,
    mut switched: EventWriter<WeaponSwitched>,
) {
    let now = time.elapsed_secs();
    for (entity, mut slots, audio) in actors.iter_mut() {
        let transitions = slots.advance(now);
        if transitions.is_empty() {
            continue;
        }
        apply_transitions(
            entity,
            &slots,
            &transitions,
            audio.map(Mut::into_inner),
            &mut switched,
        );
    }
}
