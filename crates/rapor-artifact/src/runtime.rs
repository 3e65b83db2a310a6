//! Embedded document runtime
//!
//! A frozen JavaScript copy of the evaluation engine, shipped inside every
//! generated document. It interprets the same serialized expression ASTs and
//! implements the same coercion and two-pass semantics as the host engine in
//! `rapor-formula`. The shared fixture file `rapor-formula/fixtures/
//! eval_cases.json` pins those semantics on both sides: the host engine is
//! asserted against it in tests, and this interpreter re-checks itself
//! against the embedded copy at document load, reporting any divergence to
//! the console.
//!
//! The renderer injects `window.RAPOR = { compiled, meta }` before this
//! script runs.

/// The interpreter + submission script embedded verbatim in each document
pub const RUNTIME_JS: &str = concat!(
    "var RAPOR_CHECK_CASES = ",
    include_str!("../../rapor-formula/fixtures/eval_cases.json"),
    ";\n",
    r#"
(function () {
  'use strict';
  var D = window.RAPOR;
  var START = 'RAPOR_V2_START';
  var END = 'RAPOR_V2_END';

  // --- value model: Number | Text | Empty, same coercions as the host ---
  function fromField(raw) {
    var t = (raw || '').trim();
    if (t === '') return { kind: 'empty' };
    var n = Number(t);
    return isFinite(n) ? { kind: 'num', value: n } : { kind: 'text', value: t };
  }
  function asNumber(v) {
    if (v.kind === 'num') return v.value;
    if (v.kind === 'text') {
      var n = Number(v.value.trim());
      return isFinite(n) ? n : null;
    }
    return null;
  }
  function truthy(v) {
    if (v.kind === 'num') return v.value !== 0;
    if (v.kind === 'text') return v.value !== '';
    return false;
  }
  function render(v) {
    if (v.kind === 'num') {
      return v.value % 1 === 0 && Math.abs(v.value) < 1e15
        ? String(Math.trunc(v.value))
        : String(v.value);
    }
    if (v.kind === 'text') return v.value;
    return '';
  }
  function numericOperand(v) {
    if (v.kind === 'empty') return 0;
    var n = asNumber(v);
    if (n === null) throw new Error('not a number');
    return n;
  }

  function evalExpr(node, fields) {
    switch (node.kind) {
      case 'number':
        return { kind: 'num', value: node.value };
      case 'text':
        return { kind: 'text', value: node.value };
      case 'field':
        return fromField(fields[node.key]);
      case 'unary':
        return { kind: 'num', value: -numericOperand(evalExpr(node.operand, fields)) };
      case 'binary':
        return evalBinary(node, fields);
      case 'call':
        return evalCall(node, fields);
      default:
        throw new Error('bad node');
    }
  }

  function evalBinary(node, fields) {
    var l = evalExpr(node.left, fields);
    var r = evalExpr(node.right, fields);
    switch (node.op) {
      case 'add': return { kind: 'num', value: numericOperand(l) + numericOperand(r) };
      case 'sub': return { kind: 'num', value: numericOperand(l) - numericOperand(r) };
      case 'mul': return { kind: 'num', value: numericOperand(l) * numericOperand(r) };
      case 'div': {
        var d = numericOperand(r);
        if (d === 0) throw new Error('division by zero');
        return { kind: 'num', value: numericOperand(l) / d };
      }
      case 'concat': return { kind: 'text', value: render(l) + render(r) };
      default: {
        var ln = asNumber(l), rn = asNumber(r), cmp;
        if (ln !== null && rn !== null) cmp = ln < rn ? -1 : ln > rn ? 1 : 0;
        else { var ls = render(l), rs = render(r); cmp = ls < rs ? -1 : ls > rs ? 1 : 0; }
        var t;
        if (node.op === 'eq') t = cmp === 0;
        else if (node.op === 'ne') t = cmp !== 0;
        else if (node.op === 'lt') t = cmp < 0;
        else if (node.op === 'le') t = cmp <= 0;
        else if (node.op === 'gt') t = cmp > 0;
        else if (node.op === 'ge') t = cmp >= 0;
        else throw new Error('bad op');
        return { kind: 'num', value: t ? 1 : 0 };
      }
    }
  }

  function evalCall(node, fields) {
    var args = node.args.map(function (a) { return evalExpr(a, fields); });
    switch (node.name) {
      case 'RATA2':
      case 'AVERAGE': {
        // non-numeric/blank drop from both sum and count
        var nums = args.map(asNumber).filter(function (n) { return n !== null; });
        if (nums.length === 0) return { kind: 'empty' };
        return { kind: 'num', value: nums.reduce(function (a, b) { return a + b; }, 0) / nums.length };
      }
      case 'SUM':
        // non-numeric/blank coerce to zero
        return {
          kind: 'num',
          value: args.reduce(function (acc, v) {
            var n = asNumber(v);
            return acc + (n === null ? 0 : n);
          }, 0)
        };
      case 'MIN':
      case 'MAX': {
        var ns = args.map(asNumber).filter(function (n) { return n !== null; });
        if (ns.length === 0) return { kind: 'empty' };
        return { kind: 'num', value: Math[node.name === 'MIN' ? 'min' : 'max'].apply(null, ns) };
      }
      case 'IF':
        if (args.length !== 3) throw new Error('IF arity');
        return truthy(args[0]) ? args[1] : args[2];
      case 'AND':
        return { kind: 'num', value: args.every(truthy) ? 1 : 0 };
      case 'OR':
        return { kind: 'num', value: args.some(truthy) ? 1 : 0 };
      default:
        throw new Error('unknown function ' + node.name);
    }
  }

  // --- DOM field access ---
  function rowElements(santriId) {
    return document.querySelectorAll('[data-santri="' + santriId + '"][data-key]');
  }
  function readFields(santriId) {
    var fields = {};
    rowElements(santriId).forEach(function (el) {
      fields[el.getAttribute('data-key')] = el.value !== undefined ? el.value : el.textContent;
    });
    return fields;
  }
  function writeField(santriId, key, value) {
    var el = document.querySelector('[data-santri="' + santriId + '"][data-key="' + key + '"]');
    if (el) el.value = value;
  }
  function santriIds() {
    var ids = [];
    document.querySelectorAll('tr[data-santri-row]').forEach(function (tr) {
      ids.push(tr.getAttribute('data-santri-row'));
    });
    return ids;
  }

  // --- two-pass recomputation, rank always after all row passes ---
  function rowPass(fields) {
    D.compiled.rowFormulas.forEach(function (f) {
      try {
        fields[f.key] = render(evalExpr(f.expr, fields));
      } catch (e) {
        /* best effort: keep prior value */
      }
    });
    return fields;
  }

  function rankPass(rows) {
    D.compiled.rankings.forEach(function (spec) {
      var order = rows.map(function (row, i) {
        var n = Number((row.fields[spec.sourceKey] || '').trim());
        return { i: i, v: isFinite(n) ? n : 0 };
      });
      // stable sort descending; ranks are strictly positional
      order.sort(function (a, b) { return b.v - a.v || a.i - b.i; });
      order.forEach(function (entry, pos) {
        var rank = pos + 1;
        rows[entry.i].fields[spec.targetKey] =
          spec.limit > 0 && rank > spec.limit ? '' : String(rank);
      });
    });
  }

  function recompute() {
    var rows = santriIds().map(function (id) {
      return { id: id, fields: rowPass(readFields(id)) };
    });
    rankPass(rows);
    rows.forEach(function (row) {
      D.compiled.rowFormulas.forEach(function (f) {
        writeField(row.id, f.key, row.fields[f.key] || '');
      });
      D.compiled.rankings.forEach(function (spec) {
        writeField(row.id, spec.targetKey, row.fields[spec.targetKey] || '');
      });
    });
  }

  // --- submission ---
  function buildPayload() {
    var records = santriIds().map(function (id) {
      var data = {};
      rowElements(id).forEach(function (el) {
        data[el.getAttribute('data-key')] = el.value !== undefined ? el.value : el.textContent;
      });
      var tr = document.querySelector('tr[data-santri-row="' + id + '"]');
      return {
        santriId: Number(id),
        santriName: tr ? tr.getAttribute('data-santri-name') : '',
        data: data
      };
    });
    return {
      meta: {
        rombelId: D.meta.rombelId,
        rombelName: D.meta.rombelName,
        templateName: D.meta.templateName,
        tahunAjaran: D.meta.tahunAjaran,
        semester: D.meta.semester,
        templateId: D.meta.templateId,
        timestamp: new Date().toISOString()
      },
      records: records
    };
  }

  function buildEnvelope(payload) {
    // UTF-8-safe Base64
    var b64 = btoa(unescape(encodeURIComponent(JSON.stringify(payload))));
    return START + b64 + END;
  }

  function sendText(note) {
    var payload = buildPayload();
    var message = 'Data Rapor ' + D.meta.rombelName + ' ' + D.meta.tahunAjaran +
      ' ' + D.meta.semester + (note ? ' ' + note : '') + '\n\n' + buildEnvelope(payload);
    var base = D.meta.waNumber ? 'https://wa.me/' + D.meta.waNumber : 'https://wa.me/';
    window.open(base + '?text=' + encodeURIComponent(message), '_blank');
  }

  function sendWebhook(done) {
    var payload = buildPayload();
    fetch(D.meta.webhook, {
      method: 'POST',
      headers: { 'Content-Type': 'application/json' },
      body: JSON.stringify(payload)
    }).then(function () { done(null); }).catch(function (e) { done(e); });
  }

  function submit() {
    if (D.meta.webhook) {
      sendWebhook(function (err) {
        if (err) { alert('Pengiriman webhook gagal'); return; }
        // hybrid: the text channel carries the same payload as a
        // human-verifiable backup
        sendText('(sudah terkirim)');
      });
    } else {
      sendText('');
    }
  }

  // self-check against the same fixture cases the host engine is tested
  // with; a divergence means this frozen copy is out of date
  function selfCheck() {
    RAPOR_CHECK_CASES.forEach(function (c) {
      var got;
      try {
        got = render(evalExpr(c.expr, c.fields));
      } catch (e) {
        got = '<error: ' + e.message + '>';
      }
      if (got !== c.expected) {
        console.error('engine check "' + c.name + '": got ' + got + ', expected ' + c.expected);
      }
    });
  }

  document.addEventListener('input', function (e) {
    if (e.target && e.target.hasAttribute('data-key')) recompute();
  });
  var btn = document.getElementById('rapor-submit');
  if (btn) btn.addEventListener('click', submit);
  selfCheck();
  recompute();
})();
"#
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_fixture_cases_parse() {
        let json = RUNTIME_JS
            .strip_prefix("var RAPOR_CHECK_CASES = ")
            .expect("runtime must open with the fixture constant")
            .split("\n;\n")
            .next()
            .unwrap();
        let cases: Vec<serde_json::Value> = serde_json::from_str(json).unwrap();
        assert!(cases.len() >= 10);
        for case in &cases {
            for field in ["name", "expr", "fields", "expected"] {
                assert!(case.get(field).is_some(), "case missing '{}'", field);
            }
        }
    }

    #[test]
    fn test_runtime_runs_self_check_before_recompute() {
        let check = RUNTIME_JS.find("selfCheck();").unwrap();
        let recompute = RUNTIME_JS.rfind("recompute();").unwrap();
        assert!(check < recompute);
    }
}
