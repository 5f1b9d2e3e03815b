//! Event handling.
//!
//! The emulator publishes its state changes as [Events](Event). [EventListeners](EventListener)
//! are registered on the [Emulator](crate::emulator::Emulator) with the
//! [add_listener](crate::emulator::Emulator::add_listener) method.
//!
//! A blanket implementation of [EventListener] for all `Fn(&Event)` is provided.

/// Represents an event that occurred while executing a program.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The program modified a memory location.
    MemoryChange {
        /// The address of the changed memory location.
        address: u16,

        /// New value of the changed memory location.
        data: u8,
    },

    /// The program modified the accumulator.
    AccumulatorChange {
        /// The new, sign-extended value of the accumulator.
        data: i16,
    },

    /// Control was transferred somewhere else than the next instruction.
    Jump {
        from: u16,
        to: u16,
    },

    /// The machine stopped to wait for a resume signal.
    Halted {
        /// Address execution continues from once resumed.
        resume: u16,
    },

    Resumed,

    /// A value was written to the output channel.
    Output {
        data: i16,
    },

    /// The program requested termination.
    Terminated,
}

/// Trait for consuming events.
pub trait EventListener {
    /// Called whenever a new event has been created.
    fn event(&mut self, event: &Event);
}

impl<F> EventListener for F where F: Fn(&Event) {
    fn event(&mut self, event: &Event) {
        self(event)
    }
}

#[derive(Default)]
pub(crate) struct EventDispatcher {
    listeners: Vec<Box<dyn EventListener>>,
}

impl EventDispatcher {
    pub fn new() -> EventDispatcher {
        EventDispatcher {
            listeners: Vec::new(),
        }
    }

    pub fn add_listener<L: EventListener + 'static>(&mut self, listener: L) {
        self.listeners.push(Box::new(listener) as Box<dyn EventListener>)
    }

    pub fn dispatch(&mut self, event: Event) {
        for listener in &mut self.listeners {
            listener.event(&event);
        }
    }
}
