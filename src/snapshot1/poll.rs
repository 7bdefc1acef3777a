//! `poll_oneoff` (§4.E). No backend in scope supports asynchronous
//! readiness notification, so every `FD_READ`/`FD_WRITE` subscription
//! reports `NOSYS` immediately; only clock subscriptions actually suspend,
//! via `tokio::time::sleep`, honouring the bindings' cancellation token (§5).

use crate::error::Result;
use crate::error::Errno;
use crate::memory::{self, GuestMemory, GuestPtr};
use crate::types::{Event, EventFdReadwrite, Eventrwflags, Eventtype, Subclockflags, Subscription, SubscriptionUnion};
use crate::Bindings;
use std::time::Duration;

pub async fn poll_oneoff(
    bindings: &Bindings,
    mem: &mut dyn GuestMemory,
    in_ptr: GuestPtr,
    out_ptr: GuestPtr,
    nsubscriptions: u32,
    nevents_ptr: GuestPtr,
) -> Result<()> {
    if nsubscriptions == 0 {
        return Err(crate::error::WasiError::new(Errno::Inval));
    }

    let mut subs = Vec::with_capacity(nsubscriptions as usize);
    for i in 0..nsubscriptions {
        let ptr = in_ptr + i * Subscription::SIZE;
        subs.push(Subscription::read(mem, ptr)?);
    }

    let mut events: Vec<Event> = Vec::new();
    let mut shortest_timeout: Option<Duration> = None;

    for sub in &subs {
        match &sub.u {
            SubscriptionUnion::Clock(clock) => {
                let dur = if clock.flags.contains(Subclockflags::SUBSCRIPTION_CLOCK_ABSTIME) {
                    let now = bindings.clock.now(clock.id)?;
                    Duration::from_nanos(clock.timeout.saturating_sub(now))
                } else {
                    Duration::from_nanos(clock.timeout)
                };
                shortest_timeout = Some(match shortest_timeout {
                    Some(current) => current.min(dur),
                    None => dur,
                });
            }
            SubscriptionUnion::FdRead(_) | SubscriptionUnion::FdWrite(_) => {
                let typ = if matches!(sub.u, SubscriptionUnion::FdRead(_)) {
                    Eventtype::FdRead
                } else {
                    Eventtype::FdWrite
                };
                // §4.E: no backend in scope supports async readiness
                // notification, so fd subscriptions fail outright.
                events.push(Event {
                    userdata: sub.userdata,
                    error: Errno::Nosys,
                    typ,
                    fd_readwrite: Some(EventFdReadwrite {
                        nbytes: 0,
                        flags: Eventrwflags::empty(),
                    }),
                });
            }
        }
    }

    if events.is_empty() {
        if let Some(dur) = shortest_timeout {
            tokio::select! {
                _ = tokio::time::sleep(dur) => {}
                _ = bindings.cancellation.cancelled() => {
                    return Err(crate::error::WasiError::new(Errno::Canceled));
                }
            }
            for sub in &subs {
                if matches!(sub.u, SubscriptionUnion::Clock(_)) {
                    events.push(Event {
                        userdata: sub.userdata,
                        error: Errno::Success,
                        typ: Eventtype::Clock,
                        fd_readwrite: None,
                    });
                }
            }
        }
    }

    for (i, event) in events.iter().enumerate() {
        event.write(mem, out_ptr + (i as u32) * Event::SIZE)?;
    }
    memory::write_u32(mem, nevents_ptr, events.len() as u32)
}
