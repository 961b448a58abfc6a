use std::cell::RefCell;
use std::rc::Rc;

use sigwire_reactive::{Derived, Effect, Scope, Signal};
use sigwire_types::Person;

/// Counter, person and logging-effect demo.
///
/// - `x` starts at 3 and is immediately reset to 0.
/// - `y` describes `x` and is only read by [`SignalsExample::on_computed`].
/// - `z` starts at 5; an effect logs every value it takes.
pub struct SignalsExample {
    x: Signal<i64>,
    y: Derived<String>,
    person: Signal<Person>,
    z: Signal<i64>,
    z_log: Rc<RefCell<Vec<i64>>>,
    z_effect: Effect,
    scope: Scope,
}

impl Default for SignalsExample {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalsExample {
    #[must_use]
    pub fn new() -> Self {
        let scope = Scope::new();

        let x = scope.signal(3_i64);
        x.set(0);

        let person = scope.signal(Person::new("John"));

        let z = scope.signal(5_i64);
        let z_log = Rc::new(RefCell::new(Vec::new()));
        let z_effect = {
            let reader = z.clone();
            let z_log = Rc::clone(&z_log);
            scope.effect(&[&z], move || {
                let value = reader.get();
                tracing::info!("z value: {value}");
                z_log.borrow_mut().push(value);
            })
        };

        let y = {
            let reader = x.clone();
            scope.derive(&[&x], move || {
                format!("The value of x changed to {}", reader.get())
            })
        };

        Self {
            x,
            y,
            person,
            z,
            z_log,
            z_effect,
            scope,
        }
    }

    /// Increase `x` by one.
    pub fn set_value(&self) {
        self.x.update(|x| x + 1);
    }

    /// Replace the person record.
    pub fn change_name(&self) {
        self.person.update(|_| Person::new("Jack"));
    }

    /// Increase `x`, then read and log the derived description.
    pub fn on_computed(&self) -> String {
        self.x.update(|x| x + 1);
        let text = self.y.get();
        tracing::info!("{text}");
        text
    }

    /// Increase `z`; the logging effect re-runs.
    pub fn on_effect(&self) {
        self.z.update(|z| z + 1);
    }

    #[must_use]
    pub fn x(&self) -> &Signal<i64> {
        &self.x
    }

    #[must_use]
    pub fn z(&self) -> &Signal<i64> {
        &self.z
    }

    #[must_use]
    pub fn person(&self) -> &Signal<Person> {
        &self.person
    }

    /// Every value the `z` effect has observed, oldest first.
    #[must_use]
    pub fn z_history(&self) -> Vec<i64> {
        self.z_log.borrow().clone()
    }

    #[must_use]
    pub fn z_effect(&self) -> &Effect {
        &self.z_effect
    }

    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    #[must_use]
    pub fn render(&self) -> Vec<String> {
        vec![
            format!("Signal x = {}", self.x.get()),
            format!("Signal z = {}", self.z.get()),
            format!("Signal Person Name - {}", self.person.with(|p| p.name().to_string())),
        ]
    }
}
