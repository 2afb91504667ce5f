use std::fmt::{self, Write};

use schema::sdl;
use schema::ScalarType;

use crate::types::Engine;

impl Engine {
    /// The whole schema served by the engine as GraphQL SDL: the host roots, then the types of
    /// every service.
    pub fn sdl(&self) -> String {
        let mut out = String::new();
        // writing into a `String` cannot fail
        let _ = self.write_sdl(&mut out);
        out
    }

    fn write_sdl<W: Write>(&self, w: &mut W) -> fmt::Result {
        writeln!(w, "schema {{")?;
        writeln!(w, "  query: {}", Self::QUERY_ROOT)?;
        writeln!(w, "  mutation: {}", Self::MUTATION_ROOT)?;
        writeln!(w, "}}")?;
        writeln!(w)?;

        let mut scalars: Vec<ScalarType> = Vec::new();
        for service in self.services.values() {
            for scalar in sdl::referenced_scalars(&service.registry) {
                if !scalars.contains(&scalar) {
                    scalars.push(scalar);
                }
            }
        }
        sdl::write_scalars(w, &scalars)?;

        writeln!(w, "type {} {{", Self::QUERY_ROOT)?;
        for (prefix, service) in &self.services {
            writeln!(w, "  {prefix}: {}", service.registry.query_root.name)?;
        }
        for host in self.host_fields.values() {
            if let Some(service) = self.services.get(&host.prefix) {
                sdl::write_field(w, &service.registry, &host.definition)?;
            }
        }
        writeln!(w, "}}")?;
        writeln!(w)?;

        writeln!(w, "type {} {{", Self::MUTATION_ROOT)?;
        for (prefix, service) in &self.services {
            writeln!(w, "  {prefix}: {}", service.registry.mutation_root.name)?;
        }
        writeln!(w, "}}")?;

        for service in self.services.values() {
            writeln!(w)?;
            sdl::write_type_definitions(w, &service.registry)?;
        }
        Ok(())
    }
}
