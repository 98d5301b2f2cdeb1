//! Rotation automatique des fonds d'écran
//!
//! Une tâche superviseur suit les [`RotationConditions`] publiées par la
//! médiathèque. Chaque axe (images, vidéos) possède au plus un timer ; tout
//! changement de ses conditions annule le timer courant avant d'en armer un
//! nouveau.
//!
//! ```text
//! BackgroundLibrary ──watch──> superviseur ──> timer images (select_random_image)
//!                                          └─> timer vidéos (select_random_video)
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::library::{AxisConditions, BackgroundLibrary, RotationConditions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Image,
    Video,
}

impl Axis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::Image => "image",
            Axis::Video => "video",
        }
    }
}

/// Durée d'une unité d'intervalle pour chaque axe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationUnits {
    /// `changeInterval` est exprimé en minutes
    pub image: Duration,
    /// `videoChangeInterval` est exprimé en heures
    pub video: Duration,
}

impl Default for RotationUnits {
    fn default() -> Self {
        Self {
            image: Duration::from_secs(60),
            video: Duration::from_secs(3600),
        }
    }
}

impl RotationUnits {
    fn for_axis(&self, axis: Axis) -> Duration {
        match axis {
            Axis::Image => self.image,
            Axis::Video => self.video,
        }
    }
}

#[derive(Default)]
struct AxisStatus {
    armed: AtomicBool,
    ticks: AtomicU64,
}

#[derive(Default)]
struct Status {
    image: AxisStatus,
    video: AxisStatus,
}

impl Status {
    fn axis(&self, axis: Axis) -> &AxisStatus {
        match axis {
            Axis::Image => &self.image,
            Axis::Video => &self.video,
        }
    }
}

/// Timer d'un axe, annulé à la destruction
struct TimerGuard {
    axis: Axis,
    status: Arc<Status>,
    task: JoinHandle<()>,
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.task.abort();
        self.status.axis(self.axis).armed.store(false, Ordering::SeqCst);
        debug!(axis = self.axis.as_str(), "Rotation timer cleared");
    }
}

struct AxisTimer {
    axis: Axis,
    current: Option<AxisConditions>,
    timer: Option<TimerGuard>,
}

impl AxisTimer {
    fn new(axis: Axis) -> Self {
        Self {
            axis,
            current: None,
            timer: None,
        }
    }

    /// Réarme si les conditions de l'axe ont changé
    fn apply(
        &mut self,
        conditions: AxisConditions,
        unit: Duration,
        library: &Arc<BackgroundLibrary>,
        status: &Arc<Status>,
    ) {
        if self.current == Some(conditions) {
            return;
        }
        self.current = Some(conditions);

        // Un seul timer par axe : l'ancien est annulé avant d'armer le nouveau
        self.timer = None;

        let Some(period) = conditions.period(unit) else {
            return;
        };

        info!(
            axis = self.axis.as_str(),
            period_secs = period.as_secs(),
            entries = conditions.entries,
            "Arming rotation timer"
        );
        status.axis(self.axis).armed.store(true, Ordering::SeqCst);
        let task = tokio::spawn(run_timer(
            self.axis,
            period,
            library.clone(),
            status.clone(),
        ));
        self.timer = Some(TimerGuard {
            axis: self.axis,
            status: status.clone(),
            task,
        });
    }
}

async fn run_timer(
    axis: Axis,
    period: Duration,
    library: Arc<BackgroundLibrary>,
    status: Arc<Status>,
) {
    // Premier tir après une période complète
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        status.axis(axis).ticks.fetch_add(1, Ordering::SeqCst);
        let picked = match axis {
            Axis::Image => library.select_random_image().await,
            Axis::Video => library.select_random_video().await,
        };
        debug!(
            axis = axis.as_str(),
            id = ?picked.map(|e| e.id),
            "Rotation tick"
        );
    }
}

async fn supervise(
    library: Arc<BackgroundLibrary>,
    units: RotationUnits,
    mut conditions: watch::Receiver<RotationConditions>,
    status: Arc<Status>,
) {
    let mut image = AxisTimer::new(Axis::Image);
    let mut video = AxisTimer::new(Axis::Video);

    loop {
        let current = *conditions.borrow_and_update();
        image.apply(current.image, units.for_axis(Axis::Image), &library, &status);
        video.apply(current.video, units.for_axis(Axis::Video), &library, &status);

        if conditions.changed().await.is_err() {
            break;
        }
    }
}

pub struct RotationScheduler;

impl RotationScheduler {
    /// Démarre la rotation pour `library`. Les timers vivent tant que le
    /// [`RotationHandle`] retourné n'est pas détruit.
    pub fn spawn(library: Arc<BackgroundLibrary>, units: RotationUnits) -> RotationHandle {
        let status = Arc::new(Status::default());
        let conditions = library.subscribe();
        let supervisor = tokio::spawn(supervise(library, units, conditions, status.clone()));
        RotationHandle {
            supervisor: Some(supervisor),
            status,
        }
    }
}

/// Contrôle de la rotation. La destruction du handle annule tous les timers.
pub struct RotationHandle {
    supervisor: Option<JoinHandle<()>>,
    status: Arc<Status>,
}

impl RotationHandle {
    pub fn is_armed(&self, axis: Axis) -> bool {
        self.status.axis(axis).armed.load(Ordering::SeqCst)
    }

    /// Nombre de rotations effectuées sur l'axe
    pub fn ticks(&self, axis: Axis) -> u64 {
        self.status.axis(axis).ticks.load(Ordering::SeqCst)
    }

    /// Arrête la rotation et attend la fin du superviseur
    pub async fn shutdown(mut self) {
        if let Some(supervisor) = self.supervisor.take() {
            supervisor.abort();
            let _ = supervisor.await;
        }
    }
}

impl Drop for RotationHandle {
    fn drop(&mut self) {
        if let Some(supervisor) = self.supervisor.take() {
            supervisor.abort();
        }
    }
}
