#[macro_use]
mod macros;

quantity!(Watts, "W");
quantity!(KilowattHours, "kWh");
